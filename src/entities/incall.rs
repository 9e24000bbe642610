//! Incall entity - An inbound DID route; its destination is the `answer` dialaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Incall database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incall")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Free-form description
    pub description: Option<String>,
    /// Sound played before routing
    pub greeting_sound: Option<String>,
}

/// Relationships of an incall
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each incall belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl ActiveModelBehavior for ActiveModel {}
