//! Call queue business logic.

use crate::{
    core::{
        dialaction::{self, DialactionOwner},
        extension::{ExtensionTarget, release_extensions},
        schedule::{ScheduledEntity, clear_schedule},
        tenant::require_tenant,
        validator::non_blank,
    },
    entities::{Queue, queue},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Creates a queue; `name` must be unique within the tenant.
pub async fn create_queue<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    name: &str,
    label: &str,
    music_on_hold: Option<String>,
) -> Result<queue::Model> {
    require_tenant(db, tenant_uuid).await?;
    let name = non_blank("name", name)?;
    if name.eq_ignore_ascii_case("general") {
        return Err(Error::invalid("name", "'general' is reserved"));
    }
    let existing = Queue::find()
        .filter(queue::Column::TenantUuid.eq(tenant_uuid))
        .filter(queue::Column::Name.eq(name.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::exists("Queue", format!("name={name}")));
    }

    queue::ActiveModel {
        tenant_uuid: Set(tenant_uuid),
        label: Set(label.trim().to_string()),
        name: Set(name),
        timeout: Set(None),
        music_on_hold: Set(music_on_hold),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a queue by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_queue<C: ConnectionTrait>(db: &C, id: i32) -> Result<queue::Model> {
    Queue::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Queue", id))
}

/// Lists the queues of a tenant ordered by name.
pub async fn list_queues<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<queue::Model>> {
    Queue::find()
        .filter(queue::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(queue::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a queue with its fallbacks, schedule and extensions.
pub async fn delete_queue<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let queue = require_queue(db, id).await?;
    dialaction::delete_dialactions(db, DialactionOwner::Queue(id)).await?;
    dialaction::unlink_destinations_to(db, "queue", &id.to_string()).await?;
    clear_schedule(db, ScheduledEntity::Queue(id)).await?;
    release_extensions(db, ExtensionTarget::Queue(id)).await?;
    queue.delete(db).await?;
    Ok(())
}
