//! Schedule entity - Opening hours shared by users, groups, queues and incalls.
//!
//! Periods live in [`super::schedule_time`]; the entities a schedule applies to are
//! recorded in [`super::schedule_path`]. The closed-hours destination is the
//! `schedule_fallback` dialaction of the schedule.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Schedule database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "schedule")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Schedule name
    pub name: Option<String>,
    /// IANA timezone the periods are expressed in
    pub timezone: Option<String>,
    /// 1 when active, 0 otherwise
    pub enabled: i32,
}

impl Model {
    /// Whether the schedule is active
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled == 1
    }
}

/// Relationships of a schedule
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each schedule belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
    /// One schedule has many periods
    #[sea_orm(has_many = "super::schedule_time::Entity")]
    Periods,
    /// One schedule applies to many entities
    #[sea_orm(has_many = "super::schedule_path::Entity")]
    Paths,
}

impl Related<super::schedule_time::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Periods.def()
    }
}

impl Related<super::schedule_path::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paths.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
