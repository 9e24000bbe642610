//! Conference room business logic.

use crate::{
    core::{
        dialaction::unlink_destinations_to,
        extension::{ExtensionTarget, release_extensions},
        tenant::require_tenant,
    },
    entities::{Conference, conference},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Creates a conference room. `max_users` of 0 means unlimited.
pub async fn create_conference<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    name: Option<String>,
    max_users: i32,
) -> Result<conference::Model> {
    require_tenant(db, tenant_uuid).await?;
    if max_users < 0 {
        return Err(Error::invalid("max_users", "cannot be negative"));
    }

    conference::ActiveModel {
        tenant_uuid: Set(tenant_uuid),
        name: Set(name),
        max_users: Set(max_users),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a conference by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_conference<C: ConnectionTrait>(db: &C, id: i32) -> Result<conference::Model> {
    Conference::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Conference", id))
}

/// Lists the conferences of a tenant.
pub async fn list_conferences<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<conference::Model>> {
    Conference::find()
        .filter(conference::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(conference::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a conference, freeing its extensions and unlinking destinations to it.
pub async fn delete_conference<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let conference = require_conference(db, id).await?;
    unlink_destinations_to(db, "conference", &id.to_string()).await?;
    release_extensions(db, ExtensionTarget::Conference(id)).await?;
    conference.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extension::{associate_extension, create_extension, extensions_of};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_conference_lifecycle() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        assert!(create_conference(&db, tenant.uuid, None, -1).await.is_err());

        let room = create_conference(&db, tenant.uuid, Some("standup".to_string()), 0).await?;
        let extension = create_extension(&db, tenant.uuid, "internal", "4000").await?;
        let target = ExtensionTarget::Conference(room.id);
        associate_extension(&db, extension.id, target).await?;

        delete_conference(&db, room.id).await?;
        assert!(extensions_of(&db, target).await?.is_empty());
        assert!(list_conferences(&db, tenant.uuid).await?.is_empty());
        Ok(())
    }
}
