//! Materialized options view - the flattened, last-value-wins options of each endpoint.
//!
//! Rows are rebuilt by [`crate::core::sip_options::refresh_options_view`]; nothing
//! else writes to this table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Options view database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "endpoint_sip_options_view")]
pub struct Model {
    /// Endpoint whose resolved options are stored
    #[sea_orm(primary_key, auto_increment = false)]
    pub root_uuid: Uuid,
    /// JSON object: section type -> { key: value }
    pub options: Json,
}

/// Relationships of a view row
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row describes one endpoint
    #[sea_orm(
        belongs_to = "super::endpoint_sip::Entity",
        from = "Column::RootUuid",
        to = "super::endpoint_sip::Column::Uuid",
        on_delete = "Cascade"
    )]
    EndpointSip,
}

impl ActiveModelBehavior for ActiveModel {}
