//! Dialaction entity - "What happens next" for a call event on an owning entity.
//!
//! `category`/`categoryval` identify the owner (e.g. `user`/`42`), `event` the
//! trigger (e.g. `noanswer`), and `action`/`actionarg1`/`actionarg2` encode the
//! destination. Use [`Model::destination`] instead of reading the raw columns.

use crate::core::dialaction::Destination;
use crate::errors;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dialaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dialaction")]
pub struct Model {
    /// Triggering event
    #[sea_orm(primary_key, auto_increment = false)]
    pub event: String,
    /// Kind of the owning entity
    #[sea_orm(primary_key, auto_increment = false)]
    pub category: String,
    /// Identifier of the owning entity
    #[sea_orm(primary_key, auto_increment = false)]
    pub categoryval: String,
    /// Destination kind
    pub action: String,
    /// First destination argument
    pub actionarg1: Option<String>,
    /// Second destination argument
    pub actionarg2: Option<String>,
    /// 0 once the destination's target has been deleted
    pub linked: i32,
}

impl Model {
    /// Decodes the action columns into a typed destination
    pub fn destination(&self) -> errors::Result<Destination> {
        Destination::from_columns(
            &self.action,
            self.actionarg1.as_deref(),
            self.actionarg2.as_deref(),
        )
    }

    /// Whether the destination target still exists
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.linked == 1
    }
}

/// Dialactions reference their owners polymorphically, so no foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
