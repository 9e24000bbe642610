//! IVR business logic - menus, their choices, and the destinations behind them.
//!
//! Each choice routes through its own dialaction (category `ivr_choice`, event
//! `ivr_choice`); the menu itself owns the `timeout`, `invalid` and `abort` events.

use crate::{
    core::{
        dialaction::{self, Destination, DialactionOwner},
        extension::{ExtensionTarget, release_extensions},
        tenant::require_tenant,
        validator::{in_range, non_blank},
    },
    entities::{Ivr, IvrChoice, ivr, ivr_choice},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::HashSet;
use tracing::debug;

const CHOICE_EVENT: &str = "ivr_choice";

/// Everything needed to create an IVR
#[derive(Debug, Clone)]
pub struct IvrArgs {
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Menu name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Sound played on entry
    pub menu_sound: String,
    /// Invalid inputs tolerated
    pub max_tries: i32,
    /// Digits and where they lead, in menu order
    pub choices: Vec<(String, Destination)>,
}

/// Creates an IVR with its choices.
pub async fn create_ivr<C: ConnectionTrait>(db: &C, args: IvrArgs) -> Result<ivr::Model> {
    require_tenant(db, args.tenant_uuid).await?;
    let name = non_blank("name", &args.name)?;
    let menu_sound = non_blank("menu_sound", &args.menu_sound)?;
    let max_tries = in_range("max_tries", args.max_tries, 1, 10)?;

    let ivr = ivr::ActiveModel {
        tenant_uuid: Set(args.tenant_uuid),
        name: Set(name),
        description: Set(args.description),
        menu_sound: Set(menu_sound),
        max_tries: Set(max_tries),
        ..Default::default()
    }
    .insert(db)
    .await?;

    set_choices(db, ivr.id, &args.choices).await?;
    debug!(id = ivr.id, choices = args.choices.len(), "created IVR");
    Ok(ivr)
}

/// Replaces the choices of an IVR. Digits must be unique and destinations valid.
pub async fn set_choices<C: ConnectionTrait>(
    db: &C,
    ivr_id: i32,
    choices: &[(String, Destination)],
) -> Result<()> {
    let ivr = require_ivr(db, ivr_id).await?;
    let mut seen = HashSet::new();
    for (exten, destination) in choices {
        let exten = non_blank("exten", exten)?;
        if !seen.insert(exten.clone()) {
            return Err(Error::exists("IVRChoice", format!("exten={exten}")));
        }
        dialaction::validate_destination(db, ivr.tenant_uuid, destination).await?;
    }

    delete_choices(db, ivr_id).await?;
    for (exten, destination) in choices {
        let choice = ivr_choice::ActiveModel {
            ivr_id: Set(ivr_id),
            exten: Set(exten.trim().to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        dialaction::set_dialaction(db, DialactionOwner::IvrChoice(choice.id), CHOICE_EVENT, destination)
            .await?;
    }
    Ok(())
}

/// Choices of an IVR with their destinations, in insertion order.
pub async fn get_choices<C: ConnectionTrait>(
    db: &C,
    ivr_id: i32,
) -> Result<Vec<(ivr_choice::Model, Option<Destination>)>> {
    let choices = IvrChoice::find()
        .filter(ivr_choice::Column::IvrId.eq(ivr_id))
        .order_by_asc(ivr_choice::Column::Id)
        .all(db)
        .await?;

    let mut result = Vec::with_capacity(choices.len());
    for choice in choices {
        let destination =
            dialaction::get_dialaction(db, DialactionOwner::IvrChoice(choice.id), CHOICE_EVENT).await?;
        result.push((choice, destination));
    }
    Ok(result)
}

async fn delete_choices<C: ConnectionTrait>(db: &C, ivr_id: i32) -> Result<()> {
    let choices = IvrChoice::find()
        .filter(ivr_choice::Column::IvrId.eq(ivr_id))
        .all(db)
        .await?;
    for choice in choices {
        dialaction::delete_dialactions(db, DialactionOwner::IvrChoice(choice.id)).await?;
        choice.delete(db).await?;
    }
    Ok(())
}

/// Finds an IVR by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_ivr<C: ConnectionTrait>(db: &C, id: i32) -> Result<ivr::Model> {
    Ivr::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("IVR", id))
}

/// Lists the IVRs of a tenant.
pub async fn list_ivrs<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<ivr::Model>> {
    Ivr::find()
        .filter(ivr::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(ivr::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes an IVR, its choices and their destinations.
pub async fn delete_ivr<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let ivr = require_ivr(db, id).await?;
    delete_choices(db, id).await?;
    dialaction::delete_dialactions(db, DialactionOwner::Ivr(id)).await?;
    dialaction::unlink_destinations_to(db, "ivr", &id.to_string()).await?;
    release_extensions(db, ExtensionTarget::Ivr(id)).await?;
    ivr.delete(db).await?;
    Ok(())
}
