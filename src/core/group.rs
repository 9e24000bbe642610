//! Ring group business logic.

use crate::{
    core::{
        dialaction::{self, DialactionOwner},
        extension::{ExtensionTarget, release_extensions},
        schedule::{ScheduledEntity, clear_schedule},
        tenant::require_tenant,
        validator::non_blank,
    },
    entities::{Group, group},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Creates a group; `name` must be unique within the tenant.
pub async fn create_group<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    name: &str,
    label: &str,
    timeout: Option<i32>,
) -> Result<group::Model> {
    require_tenant(db, tenant_uuid).await?;
    let name = non_blank("name", name)?;
    if timeout.is_some_and(|t| t < 0) {
        return Err(Error::invalid("timeout", "cannot be negative"));
    }
    let existing = Group::find()
        .filter(group::Column::TenantUuid.eq(tenant_uuid))
        .filter(group::Column::Name.eq(name.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::exists("Group", format!("name={name}")));
    }

    group::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        tenant_uuid: Set(tenant_uuid),
        label: Set(if label.trim().is_empty() { name.clone() } else { label.trim().to_string() }),
        name: Set(name),
        timeout: Set(timeout),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a group by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_group<C: ConnectionTrait>(db: &C, id: i32) -> Result<group::Model> {
    Group::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Group", id))
}

/// Lists the groups of a tenant ordered by name.
pub async fn list_groups<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<group::Model>> {
    Group::find()
        .filter(group::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(group::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a group with its fallbacks, schedule and extensions.
pub async fn delete_group<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let group = require_group(db, id).await?;
    dialaction::delete_dialactions(db, DialactionOwner::Group(id)).await?;
    dialaction::unlink_destinations_to(db, "group", &id.to_string()).await?;
    clear_schedule(db, ScheduledEntity::Group(id)).await?;
    release_extensions(db, ExtensionTarget::Group(id)).await?;
    group.delete(db).await?;
    Ok(())
}
