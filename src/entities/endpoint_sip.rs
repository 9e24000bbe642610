//! SIP endpoint entity - One PJSIP endpoint configuration, or a reusable template.
//!
//! The endpoint's options live in its sections (see [`super::endpoint_sip_section`]);
//! templates it inherits from are recorded in [`super::endpoint_sip_template`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SIP endpoint database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "endpoint_sip")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Free-form label shown to administrators
    pub label: Option<String>,
    /// Unique endpoint name, used as the Asterisk section name
    #[sea_orm(unique)]
    pub name: String,
    /// Optional Asterisk identifier override
    pub asterisk_id: Option<String>,
    /// Transport this endpoint is bound to
    pub transport_uuid: Option<Uuid>,
    /// Whether this endpoint is a template other endpoints may inherit from
    pub template: bool,
}

/// Relationships of a SIP endpoint
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each endpoint belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
    /// Each endpoint optionally uses a transport
    #[sea_orm(
        belongs_to = "super::transport::Entity",
        from = "Column::TransportUuid",
        to = "super::transport::Column::Uuid",
        on_delete = "SetNull"
    )]
    Transport,
    /// One endpoint owns many sections
    #[sea_orm(has_many = "super::endpoint_sip_section::Entity")]
    Sections,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::transport::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transport.def()
    }
}

impl Related<super::endpoint_sip_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
