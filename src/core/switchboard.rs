//! Switchboard business logic.

use crate::{
    core::{
        dialaction::{self, DialactionOwner},
        tenant::require_tenant,
        validator::non_blank,
    },
    entities::{Switchboard, switchboard},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Creates a switchboard.
pub async fn create_switchboard<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    name: &str,
    timeout: Option<i32>,
) -> Result<switchboard::Model> {
    require_tenant(db, tenant_uuid).await?;
    let name = non_blank("name", name)?;
    if timeout.is_some_and(|t| t < 0) {
        return Err(Error::invalid("timeout", "cannot be negative"));
    }

    switchboard::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        tenant_uuid: Set(tenant_uuid),
        name: Set(name),
        timeout: Set(timeout),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a switchboard by UUID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_switchboard<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<switchboard::Model> {
    Switchboard::find_by_id(uuid)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Switchboard", uuid))
}

/// Lists the switchboards of a tenant ordered by name.
pub async fn list_switchboards<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<switchboard::Model>> {
    Switchboard::find()
        .filter(switchboard::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(switchboard::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a switchboard with its fallbacks and unlinks destinations to it.
pub async fn delete_switchboard<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<()> {
    let switchboard = require_switchboard(db, uuid).await?;
    dialaction::delete_dialactions(db, DialactionOwner::Switchboard(uuid)).await?;
    dialaction::unlink_destinations_to(db, "switchboard", &uuid.to_string()).await?;
    switchboard.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dialaction::Destination;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_delete_switchboard_unlinks_incoming_routes() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let user = create_test_user(&db, tenant.uuid, "Alice").await?;
        let switchboard = create_switchboard(&db, tenant.uuid, "reception", Some(30)).await?;
        let owner = DialactionOwner::User(user.id);
        dialaction::set_dialaction(
            &db,
            owner,
            "noanswer",
            &Destination::Switchboard {
                switchboard_uuid: switchboard.uuid,
                ring_time: None,
            },
        )
        .await?;
        dialaction::set_dialaction(
            &db,
            DialactionOwner::Switchboard(switchboard.uuid),
            "fail",
            &Destination::Hangup,
        )
        .await?;

        delete_switchboard(&db, switchboard.uuid).await?;
        assert!(!dialaction::list_dialactions(&db, owner).await?[0].is_linked());
        assert!(
            dialaction::list_dialactions(&db, DialactionOwner::Switchboard(switchboard.uuid))
                .await?
                .is_empty()
        );
        Ok(())
    }
}
