//! User business logic - users, their voicemail and their fallbacks.

use crate::{
    core::{
        dialaction::{self, DialactionOwner},
        extension::{ExtensionTarget, release_extensions},
        schedule::{ScheduledEntity, clear_schedule},
        tenant::require_tenant,
        validator::{ensure_same_tenant, in_range, non_blank},
        voicemail::require_voicemail,
    },
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Default ring time in seconds
pub const DEFAULT_RINGSECONDS: i32 = 30;

/// Everything needed to create a user
#[derive(Debug, Clone)]
pub struct UserArgs {
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// First name
    pub firstname: String,
    /// Last name
    pub lastname: Option<String>,
    /// Seconds to ring before the no-answer fallback
    pub ringseconds: i32,
}

impl UserArgs {
    /// Arguments with the default ring time
    #[must_use]
    pub fn new(tenant_uuid: Uuid, firstname: impl Into<String>) -> Self {
        Self {
            tenant_uuid,
            firstname: firstname.into(),
            lastname: None,
            ringseconds: DEFAULT_RINGSECONDS,
        }
    }
}

/// Creates a user.
pub async fn create_user<C: ConnectionTrait>(db: &C, args: UserArgs) -> Result<user::Model> {
    require_tenant(db, args.tenant_uuid).await?;
    let firstname = non_blank("firstname", &args.firstname)?;
    let ringseconds = in_range("ringseconds", args.ringseconds, 0, 10_800)?;

    let user = user::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        tenant_uuid: Set(args.tenant_uuid),
        firstname: Set(firstname),
        lastname: Set(args.lastname),
        ringseconds: Set(ringseconds),
        enablevoicemail: Set(0),
        voicemail_id: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    debug!(id = user.id, uuid = %user.uuid, "created user");
    Ok(user)
}

/// Finds a user by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model> {
    User::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", id))
}

/// Finds a user by UUID.
pub async fn get_user_by_uuid<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Uuid.eq(uuid))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists the users of a tenant ordered by name.
pub async fn list_users<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(user::Column::Firstname)
        .order_by_asc(user::Column::Lastname)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Attaches a voicemail box to a user and enables it.
pub async fn associate_voicemail<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    voicemail_id: i32,
) -> Result<user::Model> {
    let user = require_user(db, user_id).await?;
    let voicemail = require_voicemail(db, voicemail_id).await?;
    ensure_same_tenant("Voicemail", user.tenant_uuid, voicemail.tenant_uuid)?;
    if user.voicemail_id.is_some() {
        return Err(Error::AlreadyAssociated {
            resource: "User",
            id: user.id.to_string(),
        });
    }

    let mut active: user::ActiveModel = user.into();
    active.voicemail_id = Set(Some(voicemail.id));
    active.enablevoicemail = Set(1);
    active.update(db).await.map_err(Into::into)
}

/// Detaches the voicemail box of a user.
pub async fn dissociate_voicemail<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model> {
    let user = require_user(db, user_id).await?;
    if user.voicemail_id.is_none() {
        return Err(Error::not_found("User voicemail", user_id));
    }

    let mut active: user::ActiveModel = user.into();
    active.voicemail_id = Set(None);
    active.enablevoicemail = Set(0);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a user with its fallbacks, schedule and extensions.
pub async fn delete_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let user = require_user(db, id).await?;
    dialaction::delete_dialactions(db, DialactionOwner::User(id)).await?;
    dialaction::unlink_destinations_to(db, "user", &id.to_string()).await?;
    clear_schedule(db, ScheduledEntity::User(id)).await?;
    release_extensions(db, ExtensionTarget::User(id)).await?;
    user.delete(db).await?;
    Ok(())
}
