//! SIP section option entity - One key/value line of a section.
//!
//! Keys may repeat within a section (several `contact` lines, for instance);
//! the autoincrement `id` preserves declaration order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SIP section option database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "endpoint_sip_section_option")]
pub struct Model {
    /// Unique identifier, also the ordering of options within a section
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning section
    pub endpoint_sip_section_uuid: Uuid,
    /// Option key (e.g. `"max_contacts"`)
    pub key: String,
    /// Option value, always stored as text
    pub value: String,
}

/// Relationships of an option
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each option belongs to one section
    #[sea_orm(
        belongs_to = "super::endpoint_sip_section::Entity",
        from = "Column::EndpointSipSectionUuid",
        to = "super::endpoint_sip_section::Column::Uuid",
        on_delete = "Cascade"
    )]
    Section,
}

impl Related<super::endpoint_sip_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Section.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
