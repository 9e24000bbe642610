//! Switchboard entity - An operator console queue.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Switchboard database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "switchboard")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Switchboard name
    pub name: String,
    /// Seconds before the `noanswer` fallback applies
    pub timeout: Option<i32>,
}

/// Relationships of a switchboard
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each switchboard belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl ActiveModelBehavior for ActiveModel {}
