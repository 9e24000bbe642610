//! SIP section entity - One typed section (aor, auth, endpoint, ...) of an endpoint.

use crate::core::sip_options::SectionType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SIP section database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "endpoint_sip_section")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    /// Owning endpoint
    pub endpoint_sip_uuid: Uuid,
    /// Section type as stored, see [`SectionType`]
    pub r#type: String,
}

impl Model {
    /// Typed view of the `type` column, `None` for unknown values
    #[must_use]
    pub fn section_type(&self) -> Option<SectionType> {
        self.r#type.parse().ok()
    }
}

/// Relationships of a section
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each section belongs to one endpoint
    #[sea_orm(
        belongs_to = "super::endpoint_sip::Entity",
        from = "Column::EndpointSipUuid",
        to = "super::endpoint_sip::Column::Uuid",
        on_delete = "Cascade"
    )]
    EndpointSip,
    /// One section holds many options
    #[sea_orm(has_many = "super::endpoint_sip_section_option::Entity")]
    Options,
}

impl Related<super::endpoint_sip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EndpointSip.def()
    }
}

impl Related<super::endpoint_sip_section_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Options.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
