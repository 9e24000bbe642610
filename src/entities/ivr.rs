//! IVR entity - An interactive voice menu. Its digit choices live in [`super::ivr_choice`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// IVR database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ivr")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Name of the menu
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Sound played when entering the menu
    pub menu_sound: String,
    /// Number of invalid inputs tolerated before the `abort` destination
    pub max_tries: i32,
}

/// Relationships of an IVR
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each IVR belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
    /// One IVR has many choices
    #[sea_orm(has_many = "super::ivr_choice::Entity")]
    Choices,
}

impl Related<super::ivr_choice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Choices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
