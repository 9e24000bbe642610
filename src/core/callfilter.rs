//! Call filter (boss/secretary) business logic.

use crate::{
    core::{
        dialaction::{self, DialactionOwner},
        tenant::require_tenant,
        validator::non_blank,
    },
    entities::{CallFilter, callfilter},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Ringing strategies a call filter accepts
pub const STRATEGIES: &[&str] = &[
    "all-recipients-then-linear-surrogates",
    "all-recipients-then-all-surrogates",
    "all-surrogates-then-all-recipients",
    "linear-surrogates-then-all-recipients",
    "all",
];

/// Creates an enabled call filter; `name` must be unique within the tenant.
pub async fn create_callfilter<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    name: &str,
    strategy: &str,
) -> Result<callfilter::Model> {
    require_tenant(db, tenant_uuid).await?;
    let name = non_blank("name", name)?;
    if !STRATEGIES.contains(&strategy) {
        return Err(Error::invalid("strategy", format!("unknown strategy '{strategy}'")));
    }
    let existing = CallFilter::find()
        .filter(callfilter::Column::TenantUuid.eq(tenant_uuid))
        .filter(callfilter::Column::Name.eq(name.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::exists("CallFilter", format!("name={name}")));
    }

    callfilter::ActiveModel {
        tenant_uuid: Set(tenant_uuid),
        name: Set(name),
        strategy: Set(strategy.to_string()),
        enabled: Set(1),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a call filter by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_callfilter<C: ConnectionTrait>(db: &C, id: i32) -> Result<callfilter::Model> {
    CallFilter::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("CallFilter", id))
}

/// Lists the call filters of a tenant.
pub async fn list_callfilters<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<callfilter::Model>> {
    CallFilter::find()
        .filter(callfilter::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(callfilter::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a call filter with its fallback.
pub async fn delete_callfilter<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let callfilter = require_callfilter(db, id).await?;
    dialaction::delete_dialactions(db, DialactionOwner::CallFilter(id)).await?;
    callfilter.delete(db).await?;
    Ok(())
}
