//! Incall business logic - inbound routes and where they are answered.

use crate::{
    core::{
        dialaction::{self, Destination, DialactionOwner},
        extension::{ExtensionTarget, release_extensions},
        schedule::{ScheduledEntity, clear_schedule},
        tenant::require_tenant,
    },
    entities::{Incall, incall},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

const ANSWER_EVENT: &str = "answer";

/// Creates an incall routed to `destination`.
pub async fn create_incall<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    description: Option<String>,
    greeting_sound: Option<String>,
    destination: &Destination,
) -> Result<incall::Model> {
    require_tenant(db, tenant_uuid).await?;
    dialaction::validate_destination(db, tenant_uuid, destination).await?;

    let incall = incall::ActiveModel {
        tenant_uuid: Set(tenant_uuid),
        description: Set(description),
        greeting_sound: Set(greeting_sound),
        ..Default::default()
    }
    .insert(db)
    .await?;
    dialaction::set_dialaction(db, DialactionOwner::Incall(incall.id), ANSWER_EVENT, destination).await?;
    Ok(incall)
}

/// Finds an incall by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_incall<C: ConnectionTrait>(db: &C, id: i32) -> Result<incall::Model> {
    Incall::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Incall", id))
}

/// Lists the incalls of a tenant.
pub async fn list_incalls<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<incall::Model>> {
    Incall::find()
        .filter(incall::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(incall::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Where an incall is answered.
pub async fn get_incall_destination<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Destination>> {
    dialaction::get_dialaction(db, DialactionOwner::Incall(id), ANSWER_EVENT).await
}

/// Reroutes an incall.
pub async fn set_incall_destination<C: ConnectionTrait>(
    db: &C,
    id: i32,
    destination: &Destination,
) -> Result<()> {
    let incall = require_incall(db, id).await?;
    dialaction::validate_destination(db, incall.tenant_uuid, destination).await?;
    dialaction::set_dialaction(db, DialactionOwner::Incall(id), ANSWER_EVENT, destination).await
}

/// Deletes an incall with its route, schedule and extensions.
pub async fn delete_incall<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let incall = require_incall(db, id).await?;
    dialaction::delete_dialactions(db, DialactionOwner::Incall(id)).await?;
    clear_schedule(db, ScheduledEntity::Incall(id)).await?;
    release_extensions(db, ExtensionTarget::Incall(id)).await?;
    incall.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_incall_destination() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let user = create_test_user(&db, tenant.uuid, "Alice").await?;

        let incall = create_incall(&db, tenant.uuid, None, None, &Destination::Hangup).await?;
        assert_eq!(
            get_incall_destination(&db, incall.id).await?,
            Some(Destination::Hangup)
        );

        let to_alice = Destination::User {
            user_id: user.id,
            ring_time: Some(25),
        };
        set_incall_destination(&db, incall.id, &to_alice).await?;
        assert_eq!(get_incall_destination(&db, incall.id).await?, Some(to_alice));

        delete_incall(&db, incall.id).await?;
        assert_eq!(get_incall_destination(&db, incall.id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_incall_to_other_tenant_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let acme = create_test_tenant(&db, "acme").await?;
        let other = create_test_tenant(&db, "other").await?;
        let user = create_test_user(&db, other.uuid, "Eve").await?;
        let destination = Destination::User {
            user_id: user.id,
            ring_time: None,
        };

        let result = create_incall(&db, acme.uuid, None, None, &destination).await;
        assert!(matches!(result, Err(Error::DifferentTenants { .. })));
        assert!(list_incalls(&db, acme.uuid).await?.is_empty());
        Ok(())
    }
}
