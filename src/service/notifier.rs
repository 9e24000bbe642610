//! Change notification - what the provisioning layer tells the rest of the platform.
//!
//! A [`ConfigEvent`] goes out after every committed change. It names the telephony
//! engine modules that must reload so the change becomes live.

use crate::errors::Result;
use async_trait::async_trait;
use sea_orm::prelude::Uuid;
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// What happened to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A new resource
    Created,
    /// An existing resource changed
    Edited,
    /// A resource went away
    Deleted,
    /// Two resources were linked
    Associated,
    /// Two resources were unlinked
    Dissociated,
}

impl EventAction {
    /// Lowercase name used in event names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Edited => "edited",
            Self::Deleted => "deleted",
            Self::Associated => "associated",
            Self::Dissociated => "dissociated",
        }
    }
}

/// Telephony engine module to reload after a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadTarget {
    /// Routing and extensions
    Dialplan,
    /// SIP endpoints and transports
    Pjsip,
    /// Call queues
    Queues,
    /// Voicemail boxes
    Voicemail,
}

impl ReloadTarget {
    /// Engine command performing the reload
    #[must_use]
    pub const fn command(self) -> &'static str {
        match self {
            Self::Dialplan => "dialplan reload",
            Self::Pjsip => "module reload res_pjsip.so",
            Self::Queues => "module reload app_queue.so",
            Self::Voicemail => "voicemail reload",
        }
    }
}

/// A committed configuration change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEvent {
    /// Resource kind, e.g. `"endpoint_sip"`
    pub resource: &'static str,
    /// What happened
    pub action: EventAction,
    /// Identifier of the changed resource
    pub id: String,
    /// Tenant the resource belongs to
    pub tenant_uuid: Option<Uuid>,
    /// Engine modules to reload
    pub reload: Vec<ReloadTarget>,
}

impl ConfigEvent {
    /// Builds an event without reload targets
    pub fn new(resource: &'static str, action: EventAction, id: impl ToString) -> Self {
        Self {
            resource,
            action,
            id: id.to_string(),
            tenant_uuid: None,
            reload: Vec::new(),
        }
    }

    /// Scopes the event to a tenant
    #[must_use]
    pub fn in_tenant(mut self, tenant_uuid: Uuid) -> Self {
        self.tenant_uuid = Some(tenant_uuid);
        self
    }

    /// Adds engine modules to reload
    #[must_use]
    pub fn reloading(mut self, targets: &[ReloadTarget]) -> Self {
        self.reload.extend_from_slice(targets);
        self.reload.sort_unstable();
        self.reload.dedup();
        self
    }

    /// Bus-style event name, e.g. `user_created`
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}_{}", self.resource, self.action.as_str())
    }
}

impl fmt::Display for ConfigEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.id)
    }
}

/// Receives committed changes
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one event. Called after the change is committed.
    async fn notify(&self, event: &ConfigEvent) -> Result<()>;
}

/// Notifier writing every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &ConfigEvent) -> Result<()> {
        let commands: Vec<&str> = event.reload.iter().map(|target| target.command()).collect();
        info!(
            event = %event.name(),
            id = %event.id,
            tenant = ?event.tenant_uuid,
            reload = ?commands,
            "configuration changed"
        );
        Ok(())
    }
}

/// Notifier keeping every event in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ConfigEvent>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first
    pub fn events(&self) -> Vec<ConfigEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of the events received so far
    pub fn names(&self) -> Vec<String> {
        self.events().iter().map(ConfigEvent::name).collect()
    }

    /// Drops every recorded event
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &ConfigEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
