//! Application entity - An external Stasis application calls may be handed to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Application database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "application")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Application name
    pub name: Option<String>,
}

/// Relationships of an application
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each application belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl ActiveModelBehavior for ActiveModel {}
