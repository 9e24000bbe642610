//! User entity - A PBX user (the `userfeatures` table).
//!
//! Legacy boolean flags are stored as 0/1 integers; use the accessor methods
//! rather than comparing the raw columns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "userfeatures")]
pub struct Model {
    /// Numeric identifier, used as dialaction `categoryval` and destination argument
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Stable external identifier
    #[sea_orm(unique)]
    pub uuid: Uuid,
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// First name
    pub firstname: String,
    /// Last name
    pub lastname: Option<String>,
    /// Seconds to ring before the no-answer fallback applies
    pub ringseconds: i32,
    /// 1 when the voicemail is enabled, 0 otherwise
    pub enablevoicemail: i32,
    /// Attached voicemail box
    pub voicemail_id: Option<i32>,
}

impl Model {
    /// Whether the user's voicemail is enabled
    #[must_use]
    pub const fn voicemail_enabled(&self) -> bool {
        self.enablevoicemail == 1
    }

    /// Display name built from first and last name
    #[must_use]
    pub fn fullname(&self) -> String {
        match &self.lastname {
            Some(lastname) if !lastname.is_empty() => format!("{} {lastname}", self.firstname),
            _ => self.firstname.clone(),
        }
    }
}

/// Relationships of a user
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each user belongs to one tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantUuid",
        to = "super::tenant::Column::Uuid",
        on_delete = "Cascade"
    )]
    Tenant,
    /// Each user optionally has a voicemail box
    #[sea_orm(
        belongs_to = "super::voicemail::Entity",
        from = "Column::VoicemailId",
        to = "super::voicemail::Column::Id",
        on_delete = "SetNull"
    )]
    Voicemail,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::voicemail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Voicemail.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
