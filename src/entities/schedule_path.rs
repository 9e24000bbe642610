//! Schedule path entity - Applies a schedule to a user, group, queue or incall.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Schedule path database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "schedule_path")]
pub struct Model {
    /// Applied schedule
    #[sea_orm(primary_key, auto_increment = false)]
    pub schedule_id: i32,
    /// Kind of the scheduled entity: `user`, `group`, `queue` or `incall`
    #[sea_orm(primary_key, auto_increment = false)]
    pub path: String,
    /// Identifier of the scheduled entity
    #[sea_orm(primary_key, auto_increment = false)]
    pub pathid: i32,
}

/// Relationships of a schedule path
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each path references one schedule
    #[sea_orm(
        belongs_to = "super::schedule::Entity",
        from = "Column::ScheduleId",
        to = "super::schedule::Column::Id",
        on_delete = "Cascade"
    )]
    Schedule,
}

impl Related<super::schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Schedule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
