//! IVR choice entity - A digit sequence of an IVR; its destination is a dialaction
//! with category `ivr_choice` and `categoryval` = choice id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// IVR choice database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ivr_choice")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning IVR
    pub ivr_id: i32,
    /// Digits the caller presses
    pub exten: String,
}

/// Relationships of an IVR choice
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each choice belongs to one IVR
    #[sea_orm(
        belongs_to = "super::ivr::Entity",
        from = "Column::IvrId",
        to = "super::ivr::Column::Id",
        on_delete = "Cascade"
    )]
    Ivr,
}

impl Related<super::ivr::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ivr.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
