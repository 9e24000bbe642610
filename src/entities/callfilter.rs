//! Call filter entity - A boss/secretary filter.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Call filter database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "callfilter")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Filter name, unique per tenant
    pub name: String,
    /// Ringing strategy (e.g. `"all-recipients-then-linear-surrogates"`)
    pub strategy: String,
    /// 1 when active, 0 otherwise
    pub enabled: i32,
}

impl Model {
    /// Whether the filter is active
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled == 1
    }
}

/// Relationships of a call filter
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each call filter belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl ActiveModelBehavior for ActiveModel {}
