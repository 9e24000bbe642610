//! Conference entity - A conference room.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Conference database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conference")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Room name
    pub name: Option<String>,
    /// Participant limit, 0 for unlimited
    pub max_users: i32,
}

/// Relationships of a conference
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each conference belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl ActiveModelBehavior for ActiveModel {}
