//! Tenant entity - A multi-tenancy partition.
//!
//! Nearly every configuration row carries a `tenant_uuid` pointing here, and
//! associations between rows of different tenants are rejected by the core layer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tenant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant")]
pub struct Model {
    /// Unique identifier for the tenant
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    /// Short unique slug used in contexts and logs (e.g. `"acme"`)
    #[sea_orm(unique)]
    pub slug: String,
    /// Display name
    pub name: String,
}

/// A tenant owns every tenant-scoped configuration row
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One tenant has many SIP endpoints
    #[sea_orm(has_many = "super::endpoint_sip::Entity")]
    EndpointSip,
    /// One tenant has many users
    #[sea_orm(has_many = "super::user::Entity")]
    User,
}

impl Related<super::endpoint_sip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EndpointSip.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
