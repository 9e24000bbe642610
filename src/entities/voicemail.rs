//! Voicemail entity - A voicemail box, identified by mailbox within a context.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Voicemail database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "voicemail")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Dialplan context of the mailbox
    pub context: String,
    /// Mailbox number, unique within `context`
    pub mailbox: String,
    /// Owner's display name
    pub fullname: String,
    /// Notification address
    pub email: Option<String>,
}

/// Relationships of a voicemail box
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each voicemail belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl ActiveModelBehavior for ActiveModel {}
