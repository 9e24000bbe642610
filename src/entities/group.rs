//! Group entity - A ring group (the `groupfeatures` table).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groupfeatures")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Stable external identifier
    #[sea_orm(unique)]
    pub uuid: Uuid,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Internal name, unique per tenant
    pub name: String,
    /// Display label
    pub label: String,
    /// Ring timeout in seconds, `None` to ring forever
    pub timeout: Option<i32>,
}

/// Relationships of a group
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each group belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl ActiveModelBehavior for ActiveModel {}
