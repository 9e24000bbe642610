//! Transport entity - A SIP transport (UDP/TCP/TLS/WS) endpoints may bind to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transport database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pjsip_transport")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    /// Unique transport name (e.g. `"transport-udp"`)
    #[sea_orm(unique)]
    pub name: String,
    /// Wire protocol: `udp`, `tcp`, `tls`, `ws` or `wss`
    pub protocol: String,
}

/// Protocols accepted for a transport
pub const PROTOCOLS: &[&str] = &["udp", "tcp", "tls", "ws", "wss"];

/// Endpoints reference transports; deleting one nulls the reference
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One transport is used by many endpoints
    #[sea_orm(has_many = "super::endpoint_sip::Entity")]
    EndpointSip,
}

impl Related<super::endpoint_sip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EndpointSip.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
