//! External application business logic.

use crate::{
    core::{dialaction::unlink_destinations_to, tenant::require_tenant},
    entities::{Application, application},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Creates an application.
pub async fn create_application<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    name: Option<String>,
) -> Result<application::Model> {
    require_tenant(db, tenant_uuid).await?;
    application::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        tenant_uuid: Set(tenant_uuid),
        name: Set(name),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds an application by UUID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_application<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<application::Model> {
    Application::find_by_id(uuid)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Application", uuid))
}

/// Lists the applications of a tenant.
pub async fn list_applications<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<application::Model>> {
    Application::find()
        .filter(application::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(application::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes an application and unlinks destinations to it.
pub async fn delete_application<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<()> {
    let application = require_application(db, uuid).await?;
    unlink_destinations_to(db, "application:custom", &uuid.to_string()).await?;
    application.delete(db).await?;
    Ok(())
}
