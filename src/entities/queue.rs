//! Queue entity - A call queue (the `queuefeatures` table).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Queue database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "queuefeatures")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Internal name, unique per tenant
    pub name: String,
    /// Display label
    pub label: String,
    /// Maximum wait time in seconds
    pub timeout: Option<i32>,
    /// Music on hold class
    pub music_on_hold: Option<String>,
}

/// Relationships of a queue
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each queue belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl ActiveModelBehavior for ActiveModel {}
