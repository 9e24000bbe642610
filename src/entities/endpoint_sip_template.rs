//! Template edge entity - `child_uuid` inherits from `parent_uuid` at `priority`.
//!
//! Lower priorities are applied first, so options from higher-priority parents
//! appear later in the resolved list and win in the single-value view.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Template edge database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "endpoint_sip_template")]
pub struct Model {
    /// Inheriting endpoint
    #[sea_orm(primary_key, auto_increment = false)]
    pub child_uuid: Uuid,
    /// Template being inherited from
    #[sea_orm(primary_key, auto_increment = false)]
    pub parent_uuid: Uuid,
    /// Application order among the child's parents
    pub priority: i32,
}

/// Both ends of the edge reference `endpoint_sip` and cascade on delete
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The inheriting endpoint
    #[sea_orm(
        belongs_to = "super::endpoint_sip::Entity",
        from = "Column::ChildUuid",
        to = "super::endpoint_sip::Column::Uuid",
        on_delete = "Cascade"
    )]
    Child,
    /// The template
    #[sea_orm(
        belongs_to = "super::endpoint_sip::Entity",
        from = "Column::ParentUuid",
        to = "super::endpoint_sip::Column::Uuid",
        on_delete = "Cascade"
    )]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}
