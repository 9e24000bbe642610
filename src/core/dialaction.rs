//! Dialaction business logic - typed destinations for call events.
//!
//! A dialaction row stores its destination as `action`/`actionarg1`/`actionarg2` strings;
//! [`Destination`] is the typed form of those three columns and every read and write goes
//! through [`Destination::from_columns`] and [`Destination::to_columns`]. The row's owner
//! is identified by `category`/`categoryval`, modelled here by [`DialactionOwner`].
//!
//! | action               | actionarg1 | actionarg2         |
//! |----------------------|------------|--------------------|
//! | `none`               |            |                    |
//! | `endcall:hangup`     |            |                    |
//! | `endcall:busy`       | timeout?   |                    |
//! | `endcall:congestion` | timeout?   |                    |
//! | `user`/`group`/`queue` | id       | ring time?         |
//! | `voicemail`          | id         | `skip;greeting`    |
//! | `ivr`/`conference`   | id         |                    |
//! | `switchboard`        | uuid       | ring time?         |
//! | `application:custom` | uuid       |                    |
//! | `extension`          | exten      | context            |
//! | `sound`              | filename   | `skip;no_answer`   |
//! | `custom`             | command    |                    |

use crate::{
    core::validator::{ensure_same_tenant, non_blank},
    entities::{
        Application, CallFilter, Conference, Dialaction, Group, Incall, Ivr, IvrChoice, Queue,
        Schedule, Switchboard, User, Voicemail, callfilter, dialaction, group, incall, ivr,
        ivr_choice, queue, schedule, switchboard, user,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which greeting a voicemail destination plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Greeting {
    /// The "line is busy" greeting
    Busy,
    /// The "not available" greeting
    Unavailable,
}

impl Greeting {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Unavailable => "unavailable",
        }
    }
}

impl FromStr for Greeting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "busy" => Ok(Self::Busy),
            "unavailable" => Ok(Self::Unavailable),
            other => Err(invalid(format!("unknown greeting '{other}'"))),
        }
    }
}

/// Where a call goes when an event fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Destination {
    /// Do nothing; the dialplan continues
    None,
    /// Hang up normally
    Hangup,
    /// Play busy tone, then hang up
    Busy {
        /// Seconds of tone before hanging up
        timeout: Option<u32>,
    },
    /// Play congestion tone, then hang up
    Congestion {
        /// Seconds of tone before hanging up
        timeout: Option<u32>,
    },
    /// Ring a user
    User {
        /// Target user
        user_id: i32,
        /// Seconds to ring
        ring_time: Option<u32>,
    },
    /// Ring a group
    Group {
        /// Target group
        group_id: i32,
        /// Seconds to ring
        ring_time: Option<u32>,
    },
    /// Enter a queue
    Queue {
        /// Target queue
        queue_id: i32,
        /// Seconds to wait
        ring_time: Option<u32>,
    },
    /// Leave a voicemail
    Voicemail {
        /// Target box
        voicemail_id: i32,
        /// Skip the instructions after the greeting
        skip_instructions: bool,
        /// Greeting override
        greeting: Option<Greeting>,
    },
    /// Enter an IVR
    Ivr {
        /// Target IVR
        ivr_id: i32,
    },
    /// Join a conference
    Conference {
        /// Target conference
        conference_id: i32,
    },
    /// Ring a switchboard
    Switchboard {
        /// Target switchboard
        switchboard_uuid: Uuid,
        /// Seconds to ring
        ring_time: Option<u32>,
    },
    /// Hand the call to an external application
    Application {
        /// Target application
        application_uuid: Uuid,
    },
    /// Dial a literal extension
    Extension {
        /// Number to dial
        exten: String,
        /// Context to dial it in
        context: String,
    },
    /// Play a sound file
    Sound {
        /// File to play
        filename: String,
        /// Let the caller skip the sound
        skip: bool,
        /// Play without answering
        no_answer: bool,
    },
    /// Run a raw dialplan command
    Custom {
        /// The command
        command: String,
    },
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidDestination {
        message: message.into(),
    }
}

fn required<'a>(action: &str, arg: Option<&'a str>) -> Result<&'a str> {
    arg.filter(|value| !value.is_empty())
        .ok_or_else(|| invalid(format!("action '{action}' requires an argument")))
}

fn parse_arg<T: FromStr>(action: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| invalid(format!("action '{action}': malformed argument '{value}'")))
}

fn optional_number(action: &str, arg: Option<&str>) -> Result<Option<u32>> {
    arg.filter(|value| !value.is_empty())
        .map(|value| parse_arg(action, value))
        .transpose()
}

fn flag(value: &str) -> bool {
    value == "1"
}

fn flag_str(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn split_pair(arg: Option<&str>) -> (&str, &str) {
    arg.and_then(|value| value.split_once(';'))
        .unwrap_or((arg.unwrap_or(""), ""))
}

impl Destination {
    /// Decodes the `action`/`actionarg1`/`actionarg2` columns.
    pub fn from_columns(action: &str, arg1: Option<&str>, arg2: Option<&str>) -> Result<Self> {
        let destination = match action {
            "none" => Self::None,
            "endcall:hangup" => Self::Hangup,
            "endcall:busy" => Self::Busy {
                timeout: optional_number(action, arg1)?,
            },
            "endcall:congestion" => Self::Congestion {
                timeout: optional_number(action, arg1)?,
            },
            "user" => Self::User {
                user_id: parse_arg(action, required(action, arg1)?)?,
                ring_time: optional_number(action, arg2)?,
            },
            "group" => Self::Group {
                group_id: parse_arg(action, required(action, arg1)?)?,
                ring_time: optional_number(action, arg2)?,
            },
            "queue" => Self::Queue {
                queue_id: parse_arg(action, required(action, arg1)?)?,
                ring_time: optional_number(action, arg2)?,
            },
            "voicemail" => {
                let (skip, greeting) = split_pair(arg2);
                Self::Voicemail {
                    voicemail_id: parse_arg(action, required(action, arg1)?)?,
                    skip_instructions: flag(skip),
                    greeting: (!greeting.is_empty())
                        .then(|| greeting.parse())
                        .transpose()?,
                }
            }
            "ivr" => Self::Ivr {
                ivr_id: parse_arg(action, required(action, arg1)?)?,
            },
            "conference" => Self::Conference {
                conference_id: parse_arg(action, required(action, arg1)?)?,
            },
            "switchboard" => Self::Switchboard {
                switchboard_uuid: parse_arg(action, required(action, arg1)?)?,
                ring_time: optional_number(action, arg2)?,
            },
            "application:custom" => Self::Application {
                application_uuid: parse_arg(action, required(action, arg1)?)?,
            },
            "extension" => Self::Extension {
                exten: required(action, arg1)?.to_string(),
                context: required(action, arg2)?.to_string(),
            },
            "sound" => {
                let (skip, no_answer) = split_pair(arg2);
                Self::Sound {
                    filename: required(action, arg1)?.to_string(),
                    skip: flag(skip),
                    no_answer: flag(no_answer),
                }
            }
            "custom" => Self::Custom {
                command: required(action, arg1)?.to_string(),
            },
            other => return Err(invalid(format!("unknown action '{other}'"))),
        };
        Ok(destination)
    }

    /// Value of the `action` column
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Hangup => "endcall:hangup",
            Self::Busy { .. } => "endcall:busy",
            Self::Congestion { .. } => "endcall:congestion",
            Self::User { .. } => "user",
            Self::Group { .. } => "group",
            Self::Queue { .. } => "queue",
            Self::Voicemail { .. } => "voicemail",
            Self::Ivr { .. } => "ivr",
            Self::Conference { .. } => "conference",
            Self::Switchboard { .. } => "switchboard",
            Self::Application { .. } => "application:custom",
            Self::Extension { .. } => "extension",
            Self::Sound { .. } => "sound",
            Self::Custom { .. } => "custom",
        }
    }

    /// Encodes into `(action, actionarg1, actionarg2)`.
    #[must_use]
    pub fn to_columns(&self) -> (String, Option<String>, Option<String>) {
        let (arg1, arg2) = match self {
            Self::None | Self::Hangup => (None, None),
            Self::Busy { timeout } | Self::Congestion { timeout } => {
                (timeout.map(|t| t.to_string()), None)
            }
            Self::User { user_id: id, ring_time }
            | Self::Group { group_id: id, ring_time }
            | Self::Queue { queue_id: id, ring_time } => {
                (Some(id.to_string()), ring_time.map(|t| t.to_string()))
            }
            Self::Voicemail {
                voicemail_id,
                skip_instructions,
                greeting,
            } => (
                Some(voicemail_id.to_string()),
                Some(format!(
                    "{};{}",
                    flag_str(*skip_instructions),
                    greeting.map_or("", Greeting::as_str)
                )),
            ),
            Self::Ivr { ivr_id: id } | Self::Conference { conference_id: id } => {
                (Some(id.to_string()), None)
            }
            Self::Switchboard {
                switchboard_uuid,
                ring_time,
            } => (
                Some(switchboard_uuid.to_string()),
                ring_time.map(|t| t.to_string()),
            ),
            Self::Application { application_uuid } => (Some(application_uuid.to_string()), None),
            Self::Extension { exten, context } => (Some(exten.clone()), Some(context.clone())),
            Self::Sound {
                filename,
                skip,
                no_answer,
            } => (
                Some(filename.clone()),
                Some(format!("{};{}", flag_str(*skip), flag_str(*no_answer))),
            ),
            Self::Custom { command } => (Some(command.clone()), None),
        };
        (self.action().to_string(), arg1, arg2)
    }

    /// The configuration row this destination points at, as `(action, actionarg1)`.
    #[must_use]
    pub fn target(&self) -> Option<(&'static str, String)> {
        match self {
            Self::User { user_id: id, .. }
            | Self::Group { group_id: id, .. }
            | Self::Queue { queue_id: id, .. }
            | Self::Voicemail { voicemail_id: id, .. }
            | Self::Ivr { ivr_id: id }
            | Self::Conference { conference_id: id } => Some((self.action(), id.to_string())),
            Self::Switchboard {
                switchboard_uuid: uuid,
                ..
            }
            | Self::Application {
                application_uuid: uuid,
            } => Some((self.action(), uuid.to_string())),
            _ => None,
        }
    }
}

/// The entity a dialaction belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialactionOwner {
    /// A user
    User(i32),
    /// A group
    Group(i32),
    /// A queue
    Queue(i32),
    /// An IVR (timeout, invalid and abort destinations)
    Ivr(i32),
    /// One choice of an IVR
    IvrChoice(i32),
    /// An incall
    Incall(i32),
    /// A schedule (closed-hours destination)
    Schedule(i32),
    /// A switchboard
    Switchboard(Uuid),
    /// A call filter
    CallFilter(i32),
}

impl DialactionOwner {
    /// Value of the `category` column
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Group(_) => "group",
            Self::Queue(_) => "queue",
            Self::Ivr(_) => "ivr",
            Self::IvrChoice(_) => "ivr_choice",
            Self::Incall(_) => "incall",
            Self::Schedule(_) => "schedule",
            Self::Switchboard(_) => "switchboard",
            Self::CallFilter(_) => "callfilter",
        }
    }

    /// Value of the `categoryval` column
    #[must_use]
    pub fn categoryval(&self) -> String {
        match self {
            Self::User(id)
            | Self::Group(id)
            | Self::Queue(id)
            | Self::Ivr(id)
            | Self::IvrChoice(id)
            | Self::Incall(id)
            | Self::Schedule(id)
            | Self::CallFilter(id) => id.to_string(),
            Self::Switchboard(uuid) => uuid.to_string(),
        }
    }

    /// Events this owner may route
    #[must_use]
    pub const fn events(&self) -> &'static [&'static str] {
        match self {
            Self::User(_) => &["noanswer", "busy", "congestion", "chanunavail"],
            Self::Group(_) => &["noanswer", "congestion"],
            Self::Queue(_) => &[
                "noanswer",
                "busy",
                "congestion",
                "chanunavail",
                "qwaittime",
                "qwaitratio",
            ],
            Self::Ivr(_) => &["timeout", "invalid", "abort"],
            Self::IvrChoice(_) => &["ivr_choice"],
            Self::Incall(_) => &["answer"],
            Self::Schedule(_) => &["schedule_fallback"],
            Self::Switchboard(_) => &["noanswer", "fail"],
            Self::CallFilter(_) => &["noanswer"],
        }
    }

    /// Fails with [`Error::InvalidEvent`] unless `event` is one of [`Self::events`].
    pub fn check_event(&self, event: &str) -> Result<()> {
        if self.events().contains(&event) {
            Ok(())
        } else {
            Err(Error::InvalidEvent {
                category: self.category().to_string(),
                event: event.to_string(),
            })
        }
    }
}

impl fmt::Display for DialactionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category(), self.categoryval())
    }
}

fn owner_filter(owner: DialactionOwner) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(dialaction::Column::Category.eq(owner.category()))
        .add(dialaction::Column::Categoryval.eq(owner.categoryval()))
}

/// Raw dialaction rows of an owner ordered by event.
pub async fn list_dialactions<C: ConnectionTrait>(
    db: &C,
    owner: DialactionOwner,
) -> Result<Vec<dialaction::Model>> {
    Dialaction::find()
        .filter(owner_filter(owner))
        .order_by_asc(dialaction::Column::Event)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Decoded destinations of an owner keyed by event.
pub async fn get_dialactions<C: ConnectionTrait>(
    db: &C,
    owner: DialactionOwner,
) -> Result<BTreeMap<String, Destination>> {
    list_dialactions(db, owner)
        .await?
        .into_iter()
        .map(|row| Ok((row.event.clone(), row.destination()?)))
        .collect()
}

/// Destination of a single event, if set.
pub async fn get_dialaction<C: ConnectionTrait>(
    db: &C,
    owner: DialactionOwner,
    event: &str,
) -> Result<Option<Destination>> {
    Dialaction::find_by_id((
        event.to_string(),
        owner.category().to_string(),
        owner.categoryval(),
    ))
    .one(db)
    .await?
    .map(|row| row.destination())
    .transpose()
}

fn active_model(owner: DialactionOwner, event: &str, destination: &Destination) -> dialaction::ActiveModel {
    let (action, actionarg1, actionarg2) = destination.to_columns();
    dialaction::ActiveModel {
        event: Set(event.to_string()),
        category: Set(owner.category().to_string()),
        categoryval: Set(owner.categoryval()),
        action: Set(action),
        actionarg1: Set(actionarg1),
        actionarg2: Set(actionarg2),
        linked: Set(1),
    }
}

/// Replaces every dialaction of an owner. Events are checked before anything is written.
pub async fn set_dialactions<C: ConnectionTrait>(
    db: &C,
    owner: DialactionOwner,
    destinations: &BTreeMap<String, Destination>,
) -> Result<()> {
    for event in destinations.keys() {
        owner.check_event(event)?;
    }

    delete_dialactions(db, owner).await?;
    for (event, destination) in destinations {
        active_model(owner, event, destination).insert(db).await?;
    }
    Ok(())
}

/// Sets the destination of one event, replacing any previous one.
pub async fn set_dialaction<C: ConnectionTrait>(
    db: &C,
    owner: DialactionOwner,
    event: &str,
    destination: &Destination,
) -> Result<()> {
    owner.check_event(event)?;
    Dialaction::delete_many()
        .filter(owner_filter(owner))
        .filter(dialaction::Column::Event.eq(event))
        .exec(db)
        .await?;
    active_model(owner, event, destination).insert(db).await?;
    Ok(())
}

/// Deletes every dialaction of an owner.
pub async fn delete_dialactions<C: ConnectionTrait>(db: &C, owner: DialactionOwner) -> Result<()> {
    Dialaction::delete_many()
        .filter(owner_filter(owner))
        .exec(db)
        .await?;
    Ok(())
}

macro_rules! tenant_owners {
    ($db:expr, $entity:ty, $module:ident, $key:ident, $tenant_uuid:expr, $owner:path) => {
        <$entity>::find()
            .filter($module::Column::TenantUuid.eq($tenant_uuid))
            .all($db)
            .await?
            .into_iter()
            .map(|model| $owner(model.$key))
    };
}

/// Deletes the dialactions of every entity of a tenant, IVR choices included.
///
/// The dialaction table has no foreign keys, so this runs before the tenant row goes.
/// Returns the number of rows deleted.
pub async fn delete_tenant_dialactions<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<u64> {
    let ivr_ids: Vec<i32> = Ivr::find()
        .filter(ivr::Column::TenantUuid.eq(tenant_uuid))
        .all(db)
        .await?
        .into_iter()
        .map(|model| model.id)
        .collect();
    let choices = if ivr_ids.is_empty() {
        Vec::new()
    } else {
        IvrChoice::find()
            .filter(ivr_choice::Column::IvrId.is_in(ivr_ids.clone()))
            .all(db)
            .await?
    };

    let mut owners: Vec<DialactionOwner> = ivr_ids.into_iter().map(DialactionOwner::Ivr).collect();
    owners.extend(choices.into_iter().map(|choice| DialactionOwner::IvrChoice(choice.id)));
    owners.extend(tenant_owners!(db, User, user, id, tenant_uuid, DialactionOwner::User));
    owners.extend(tenant_owners!(db, Group, group, id, tenant_uuid, DialactionOwner::Group));
    owners.extend(tenant_owners!(db, Queue, queue, id, tenant_uuid, DialactionOwner::Queue));
    owners.extend(tenant_owners!(db, Incall, incall, id, tenant_uuid, DialactionOwner::Incall));
    owners.extend(tenant_owners!(db, Schedule, schedule, id, tenant_uuid, DialactionOwner::Schedule));
    owners.extend(tenant_owners!(
        db,
        Switchboard,
        switchboard,
        uuid,
        tenant_uuid,
        DialactionOwner::Switchboard
    ));
    owners.extend(tenant_owners!(
        db,
        CallFilter,
        callfilter,
        id,
        tenant_uuid,
        DialactionOwner::CallFilter
    ));

    let mut by_category: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    for owner in owners {
        by_category
            .entry(owner.category())
            .or_default()
            .push(owner.categoryval());
    }

    let mut deleted = 0;
    for (category, values) in by_category {
        deleted += Dialaction::delete_many()
            .filter(dialaction::Column::Category.eq(category))
            .filter(dialaction::Column::Categoryval.is_in(values))
            .exec(db)
            .await?
            .rows_affected;
    }
    Ok(deleted)
}

/// Marks every dialaction pointing at a deleted target as unlinked.
///
/// Returns the number of rows touched.
pub async fn unlink_destinations_to<C: ConnectionTrait>(
    db: &C,
    action: &str,
    actionarg1: &str,
) -> Result<u64> {
    let result = Dialaction::update_many()
        .col_expr(dialaction::Column::Linked, Expr::value(0))
        .filter(dialaction::Column::Action.eq(action))
        .filter(dialaction::Column::Actionarg1.eq(actionarg1))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

macro_rules! target_tenant {
    ($db:expr, $entity:ty, $id:expr, $resource:literal) => {
        <$entity>::find_by_id($id)
            .one($db)
            .await?
            .map(|model| model.tenant_uuid)
            .ok_or_else(|| Error::not_found($resource, $id))?
    };
}

/// Checks that a destination's target exists in `tenant_uuid` and its arguments are usable.
pub async fn validate_destination<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    destination: &Destination,
) -> Result<()> {
    let (resource, target_tenant) = match destination {
        Destination::None
        | Destination::Hangup
        | Destination::Busy { .. }
        | Destination::Congestion { .. } => return Ok(()),
        Destination::Extension { exten, context } => {
            non_blank("exten", exten)?;
            non_blank("context", context)?;
            return Ok(());
        }
        Destination::Sound { filename, .. } => {
            non_blank("filename", filename)?;
            return Ok(());
        }
        Destination::Custom { command } => {
            non_blank("command", command)?;
            return Ok(());
        }
        Destination::User { user_id, .. } => ("User", target_tenant!(db, User, *user_id, "User")),
        Destination::Group { group_id, .. } => {
            ("Group", target_tenant!(db, Group, *group_id, "Group"))
        }
        Destination::Queue { queue_id, .. } => {
            ("Queue", target_tenant!(db, Queue, *queue_id, "Queue"))
        }
        Destination::Voicemail { voicemail_id, .. } => (
            "Voicemail",
            target_tenant!(db, Voicemail, *voicemail_id, "Voicemail"),
        ),
        Destination::Ivr { ivr_id } => ("IVR", target_tenant!(db, Ivr, *ivr_id, "IVR")),
        Destination::Conference { conference_id } => (
            "Conference",
            target_tenant!(db, Conference, *conference_id, "Conference"),
        ),
        Destination::Switchboard {
            switchboard_uuid, ..
        } => (
            "Switchboard",
            target_tenant!(db, Switchboard, *switchboard_uuid, "Switchboard"),
        ),
        Destination::Application { application_uuid } => (
            "Application",
            target_tenant!(db, Application, *application_uuid, "Application"),
        ),
    };
    ensure_same_tenant(resource, tenant_uuid, target_tenant)
}

/// Tenant of the entity owning a dialaction, failing with [`Error::NotFound`].
pub async fn owner_tenant<C: ConnectionTrait>(db: &C, owner: DialactionOwner) -> Result<Uuid> {
    let tenant_uuid = match owner {
        DialactionOwner::User(id) => target_tenant!(db, User, id, "User"),
        DialactionOwner::Group(id) => target_tenant!(db, Group, id, "Group"),
        DialactionOwner::Queue(id) => target_tenant!(db, Queue, id, "Queue"),
        DialactionOwner::Ivr(id) => target_tenant!(db, Ivr, id, "IVR"),
        DialactionOwner::IvrChoice(id) => {
            let choice = IvrChoice::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("IVRChoice", id))?;
            target_tenant!(db, Ivr, choice.ivr_id, "IVR")
        }
        DialactionOwner::Incall(id) => target_tenant!(db, Incall, id, "Incall"),
        DialactionOwner::Schedule(id) => target_tenant!(db, Schedule, id, "Schedule"),
        DialactionOwner::Switchboard(uuid) => target_tenant!(db, Switchboard, uuid, "Switchboard"),
        DialactionOwner::CallFilter(id) => target_tenant!(db, CallFilter, id, "CallFilter"),
    };
    Ok(tenant_uuid)
}
