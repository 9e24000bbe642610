//! Extension entity - A dialable number within a context.
//!
//! `type`/`typeval` point at the entity the number reaches (e.g. `queue`/`12`);
//! both are empty strings while the extension is unassociated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extension database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "extensions")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Dialplan context
    pub context: String,
    /// Dialable number, unique within `context`
    pub exten: String,
    /// Kind of the associated entity, empty when free
    pub r#type: String,
    /// Identifier of the associated entity, empty when free
    pub typeval: String,
}

impl Model {
    /// Whether the extension currently routes to an entity
    #[must_use]
    pub fn is_associated(&self) -> bool {
        !self.r#type.is_empty()
    }
}

/// Relationships of an extension
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each extension belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl ActiveModelBehavior for ActiveModel {}
