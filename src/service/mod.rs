//! Service layer - validated, transactional provisioning operations.
//!
//! Each mutating method opens one database transaction, runs the core functions on it,
//! commits, and only then hands a [`ConfigEvent`] to the [`Notifier`]. A failed operation
//! drops its transaction, so nothing is written and nothing is announced.
//! SIP changes also rebuild the materialized options view inside the same transaction.

pub mod notifier;

pub use notifier::{ConfigEvent, EventAction, LogNotifier, Notifier, RecordingNotifier, ReloadTarget};

use crate::{
    core::{
        application, callfilter, conference,
        dialaction::{self, Destination, DialactionOwner},
        endpoint_sip::{self, EndpointSipArgs},
        extension::{self, ExtensionTarget},
        group, incall,
        ivr::{self, IvrArgs},
        queue,
        schedule::{self, ScheduleArgs, ScheduledEntity},
        sip_options::{self, OptionsView},
        switchboard, tenant, transport,
        user::{self, UserArgs},
        voicemail,
    },
    entities,
    errors::Result,
};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait, prelude::Uuid};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{instrument, warn};

use self::EventAction::{Associated, Created, Deleted, Dissociated, Edited};
use self::ReloadTarget::{Dialplan, Pjsip, Queues, Voicemail};

/// Entry point for every provisioning change
pub struct Provisioner {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner").finish_non_exhaustive()
    }
}

impl Provisioner {
    /// Creates a provisioner over a connection pool
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// The underlying connection, for read-only queries
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn finish(&self, txn: DatabaseTransaction, event: ConfigEvent) -> Result<()> {
        txn.commit().await?;
        if let Err(e) = self.notifier.notify(&event).await {
            warn!(event = %event, error = %e, "failed to deliver configuration event");
        }
        Ok(())
    }

    // Tenants and transports

    /// Creates a tenant.
    #[instrument(skip(self))]
    pub async fn create_tenant(&self, slug: &str, name: &str) -> Result<entities::tenant::Model> {
        let txn = self.db.begin().await?;
        let tenant = tenant::create_tenant(&txn, slug, name).await?;
        let event = ConfigEvent::new("tenant", Created, tenant.uuid).in_tenant(tenant.uuid);
        self.finish(txn, event).await?;
        Ok(tenant)
    }

    /// Deletes a tenant and everything scoped to it.
    #[instrument(skip(self))]
    pub async fn delete_tenant(&self, uuid: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;
        tenant::delete_tenant(&txn, uuid).await?;
        sip_options::refresh_options_view(&txn).await?;
        let event = ConfigEvent::new("tenant", Deleted, uuid)
            .in_tenant(uuid)
            .reloading(&[Dialplan, Pjsip, Queues, Voicemail]);
        self.finish(txn, event).await
    }

    /// Creates a SIP transport.
    #[instrument(skip(self))]
    pub async fn create_transport(&self, name: &str, protocol: &str) -> Result<entities::transport::Model> {
        let txn = self.db.begin().await?;
        let transport = transport::create_transport(&txn, name, protocol).await?;
        let event = ConfigEvent::new("transport", Created, transport.uuid).reloading(&[Pjsip]);
        self.finish(txn, event).await?;
        Ok(transport)
    }

    /// Deletes a SIP transport; endpoints using it lose their binding.
    #[instrument(skip(self))]
    pub async fn delete_transport(&self, uuid: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;
        transport::delete_transport(&txn, uuid).await?;
        let event = ConfigEvent::new("transport", Deleted, uuid).reloading(&[Pjsip]);
        self.finish(txn, event).await
    }

    // SIP endpoints

    /// Creates a SIP endpoint or template.
    #[instrument(skip(self, args), fields(tenant = %args.tenant_uuid))]
    pub async fn create_endpoint(&self, args: EndpointSipArgs) -> Result<entities::endpoint_sip::Model> {
        let txn = self.db.begin().await?;
        let endpoint = endpoint_sip::create_endpoint(&txn, args).await?;
        sip_options::refresh_options_view(&txn).await?;
        let event = ConfigEvent::new("endpoint_sip", Created, endpoint.uuid)
            .in_tenant(endpoint.tenant_uuid)
            .reloading(&[Pjsip]);
        self.finish(txn, event).await?;
        Ok(endpoint)
    }

    /// Replaces a SIP endpoint's attributes and own options.
    #[instrument(skip(self, args))]
    pub async fn update_endpoint(
        &self,
        uuid: Uuid,
        args: EndpointSipArgs,
    ) -> Result<entities::endpoint_sip::Model> {
        let txn = self.db.begin().await?;
        let endpoint = endpoint_sip::update_endpoint(&txn, uuid, args).await?;
        sip_options::refresh_options_view(&txn).await?;
        let event = ConfigEvent::new("endpoint_sip", Edited, uuid)
            .in_tenant(endpoint.tenant_uuid)
            .reloading(&[Pjsip]);
        self.finish(txn, event).await?;
        Ok(endpoint)
    }

    /// Deletes a SIP endpoint.
    #[instrument(skip(self))]
    pub async fn delete_endpoint(&self, uuid: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;
        let endpoint = endpoint_sip::require_endpoint(&txn, uuid).await?;
        endpoint_sip::delete_endpoint(&txn, uuid).await?;
        sip_options::refresh_options_view(&txn).await?;
        let event = ConfigEvent::new("endpoint_sip", Deleted, uuid)
            .in_tenant(endpoint.tenant_uuid)
            .reloading(&[Pjsip]);
        self.finish(txn, event).await
    }

    /// Replaces the templates of an endpoint, in priority order.
    #[instrument(skip(self))]
    pub async fn set_endpoint_templates(&self, uuid: Uuid, templates: &[Uuid]) -> Result<()> {
        let txn = self.db.begin().await?;
        let endpoint = endpoint_sip::require_endpoint(&txn, uuid).await?;
        endpoint_sip::set_templates(&txn, uuid, templates).await?;
        sip_options::refresh_options_view(&txn).await?;
        let event = ConfigEvent::new("endpoint_sip_templates", Associated, uuid)
            .in_tenant(endpoint.tenant_uuid)
            .reloading(&[Pjsip]);
        self.finish(txn, event).await
    }

    /// Single-value options of an endpoint, from the stored view when available.
    pub async fn endpoint_options(&self, uuid: Uuid) -> Result<OptionsView> {
        match sip_options::get_options_view(&self.db, uuid).await? {
            Some(view) => Ok(view),
            None => sip_options::resolve_options_view(&self.db, uuid).await,
        }
    }

    /// Endpoint authenticating with `username`.
    pub async fn find_endpoint_by_username(
        &self,
        username: &str,
    ) -> Result<Option<entities::endpoint_sip::Model>> {
        sip_options::find_endpoint_by_username(&self.db, username).await
    }

    /// Rebuilds the materialized options view.
    #[instrument(skip(self))]
    pub async fn refresh_options_view(&self) -> Result<usize> {
        let txn = self.db.begin().await?;
        let count = sip_options::refresh_options_view(&txn).await?;
        txn.commit().await?;
        Ok(count)
    }

    // Users and voicemail

    /// Creates a user.
    #[instrument(skip(self, args), fields(tenant = %args.tenant_uuid))]
    pub async fn create_user(&self, args: UserArgs) -> Result<entities::user::Model> {
        let txn = self.db.begin().await?;
        let user = user::create_user(&txn, args).await?;
        let event = ConfigEvent::new("user", Created, user.id)
            .in_tenant(user.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(user)
    }

    /// Deletes a user.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let user = user::require_user(&txn, id).await?;
        user::delete_user(&txn, id).await?;
        let event = ConfigEvent::new("user", Deleted, id)
            .in_tenant(user.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Creates a voicemail box.
    #[instrument(skip(self))]
    pub async fn create_voicemail(
        &self,
        tenant_uuid: Uuid,
        context: &str,
        mailbox: &str,
        fullname: &str,
        email: Option<String>,
    ) -> Result<entities::voicemail::Model> {
        let txn = self.db.begin().await?;
        tenant::require_tenant(&txn, tenant_uuid).await?;
        let voicemail =
            voicemail::create_voicemail(&txn, tenant_uuid, context, mailbox, fullname, email).await?;
        let event = ConfigEvent::new("voicemail", Created, voicemail.id)
            .in_tenant(tenant_uuid)
            .reloading(&[Voicemail]);
        self.finish(txn, event).await?;
        Ok(voicemail)
    }

    /// Deletes a voicemail box.
    #[instrument(skip(self))]
    pub async fn delete_voicemail(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let voicemail = voicemail::require_voicemail(&txn, id).await?;
        voicemail::delete_voicemail(&txn, id).await?;
        let event = ConfigEvent::new("voicemail", Deleted, id)
            .in_tenant(voicemail.tenant_uuid)
            .reloading(&[Voicemail, Dialplan]);
        self.finish(txn, event).await
    }

    /// Attaches a voicemail box to a user.
    #[instrument(skip(self))]
    pub async fn associate_user_voicemail(&self, user_id: i32, voicemail_id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let user = user::associate_voicemail(&txn, user_id, voicemail_id).await?;
        let event = ConfigEvent::new("user_voicemail", Associated, user_id)
            .in_tenant(user.tenant_uuid)
            .reloading(&[Voicemail, Dialplan]);
        self.finish(txn, event).await
    }

    /// Detaches the voicemail box of a user.
    #[instrument(skip(self))]
    pub async fn dissociate_user_voicemail(&self, user_id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let user = user::dissociate_voicemail(&txn, user_id).await?;
        let event = ConfigEvent::new("user_voicemail", Dissociated, user_id)
            .in_tenant(user.tenant_uuid)
            .reloading(&[Voicemail, Dialplan]);
        self.finish(txn, event).await
    }

    // Dialactions

    /// Replaces the fallback destinations of an owner. Every destination must exist in
    /// the owner's tenant.
    #[instrument(skip(self, owner, destinations), fields(owner = %owner))]
    pub async fn set_fallbacks(
        &self,
        owner: DialactionOwner,
        destinations: &BTreeMap<String, Destination>,
    ) -> Result<()> {
        let txn = self.db.begin().await?;
        let tenant_uuid = dialaction::owner_tenant(&txn, owner).await?;
        for destination in destinations.values() {
            dialaction::validate_destination(&txn, tenant_uuid, destination).await?;
        }
        dialaction::set_dialactions(&txn, owner, destinations).await?;
        let event = ConfigEvent::new("dialaction", Edited, owner)
            .in_tenant(tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Fallback destinations of an owner keyed by event.
    pub async fn fallbacks(&self, owner: DialactionOwner) -> Result<BTreeMap<String, Destination>> {
        dialaction::get_dialactions(&self.db, owner).await
    }

    // Routing targets

    /// Creates a ring group.
    #[instrument(skip(self))]
    pub async fn create_group(
        &self,
        tenant_uuid: Uuid,
        name: &str,
        label: &str,
        timeout: Option<i32>,
    ) -> Result<entities::group::Model> {
        let txn = self.db.begin().await?;
        let group = group::create_group(&txn, tenant_uuid, name, label, timeout).await?;
        let event = ConfigEvent::new("group", Created, group.id)
            .in_tenant(tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(group)
    }

    /// Deletes a ring group.
    #[instrument(skip(self))]
    pub async fn delete_group(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let group = group::require_group(&txn, id).await?;
        group::delete_group(&txn, id).await?;
        let event = ConfigEvent::new("group", Deleted, id)
            .in_tenant(group.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Creates a queue.
    #[instrument(skip(self))]
    pub async fn create_queue(
        &self,
        tenant_uuid: Uuid,
        name: &str,
        label: &str,
        music_on_hold: Option<String>,
    ) -> Result<entities::queue::Model> {
        let txn = self.db.begin().await?;
        let queue = queue::create_queue(&txn, tenant_uuid, name, label, music_on_hold).await?;
        let event = ConfigEvent::new("queue", Created, queue.id)
            .in_tenant(tenant_uuid)
            .reloading(&[Queues, Dialplan]);
        self.finish(txn, event).await?;
        Ok(queue)
    }

    /// Deletes a queue.
    #[instrument(skip(self))]
    pub async fn delete_queue(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let queue = queue::require_queue(&txn, id).await?;
        queue::delete_queue(&txn, id).await?;
        let event = ConfigEvent::new("queue", Deleted, id)
            .in_tenant(queue.tenant_uuid)
            .reloading(&[Queues, Dialplan]);
        self.finish(txn, event).await
    }

    /// Creates an IVR with its choices.
    #[instrument(skip(self, args), fields(tenant = %args.tenant_uuid))]
    pub async fn create_ivr(&self, args: IvrArgs) -> Result<entities::ivr::Model> {
        let txn = self.db.begin().await?;
        let ivr = ivr::create_ivr(&txn, args).await?;
        let event = ConfigEvent::new("ivr", Created, ivr.id)
            .in_tenant(ivr.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(ivr)
    }

    /// Deletes an IVR.
    #[instrument(skip(self))]
    pub async fn delete_ivr(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let ivr = ivr::require_ivr(&txn, id).await?;
        ivr::delete_ivr(&txn, id).await?;
        let event = ConfigEvent::new("ivr", Deleted, id)
            .in_tenant(ivr.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Replaces the choices of an IVR.
    #[instrument(skip(self, choices), fields(choices = choices.len()))]
    pub async fn set_ivr_choices(&self, id: i32, choices: &[(String, Destination)]) -> Result<()> {
        let txn = self.db.begin().await?;
        let ivr = ivr::require_ivr(&txn, id).await?;
        ivr::set_choices(&txn, id, choices).await?;
        let event = ConfigEvent::new("ivr", Edited, id)
            .in_tenant(ivr.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Creates an incall answered at `destination`.
    #[instrument(skip(self))]
    pub async fn create_incall(
        &self,
        tenant_uuid: Uuid,
        description: Option<String>,
        destination: &Destination,
    ) -> Result<entities::incall::Model> {
        let txn = self.db.begin().await?;
        let incall = incall::create_incall(&txn, tenant_uuid, description, None, destination).await?;
        let event = ConfigEvent::new("incall", Created, incall.id)
            .in_tenant(tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(incall)
    }

    /// Deletes an incall.
    #[instrument(skip(self))]
    pub async fn delete_incall(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let incall = incall::require_incall(&txn, id).await?;
        incall::delete_incall(&txn, id).await?;
        let event = ConfigEvent::new("incall", Deleted, id)
            .in_tenant(incall.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Reroutes an incall.
    #[instrument(skip(self))]
    pub async fn set_incall_destination(&self, id: i32, destination: &Destination) -> Result<()> {
        let txn = self.db.begin().await?;
        let incall = incall::require_incall(&txn, id).await?;
        incall::set_incall_destination(&txn, id, destination).await?;
        let event = ConfigEvent::new("incall", Edited, id)
            .in_tenant(incall.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Creates a conference room.
    #[instrument(skip(self))]
    pub async fn create_conference(
        &self,
        tenant_uuid: Uuid,
        name: Option<String>,
        max_users: i32,
    ) -> Result<entities::conference::Model> {
        let txn = self.db.begin().await?;
        let conference = conference::create_conference(&txn, tenant_uuid, name, max_users).await?;
        let event = ConfigEvent::new("conference", Created, conference.id)
            .in_tenant(tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(conference)
    }

    /// Deletes a conference room.
    #[instrument(skip(self))]
    pub async fn delete_conference(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let conference = conference::require_conference(&txn, id).await?;
        conference::delete_conference(&txn, id).await?;
        let event = ConfigEvent::new("conference", Deleted, id)
            .in_tenant(conference.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Creates an external application.
    #[instrument(skip(self))]
    pub async fn create_application(
        &self,
        tenant_uuid: Uuid,
        name: Option<String>,
    ) -> Result<entities::application::Model> {
        let txn = self.db.begin().await?;
        let application = application::create_application(&txn, tenant_uuid, name).await?;
        let event = ConfigEvent::new("application", Created, application.uuid)
            .in_tenant(tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(application)
    }

    /// Deletes an external application.
    #[instrument(skip(self))]
    pub async fn delete_application(&self, uuid: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;
        let application = application::require_application(&txn, uuid).await?;
        application::delete_application(&txn, uuid).await?;
        let event = ConfigEvent::new("application", Deleted, uuid)
            .in_tenant(application.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Creates a switchboard.
    #[instrument(skip(self))]
    pub async fn create_switchboard(
        &self,
        tenant_uuid: Uuid,
        name: &str,
        timeout: Option<i32>,
    ) -> Result<entities::switchboard::Model> {
        let txn = self.db.begin().await?;
        let switchboard = switchboard::create_switchboard(&txn, tenant_uuid, name, timeout).await?;
        let event = ConfigEvent::new("switchboard", Created, switchboard.uuid)
            .in_tenant(tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(switchboard)
    }

    /// Deletes a switchboard.
    #[instrument(skip(self))]
    pub async fn delete_switchboard(&self, uuid: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;
        let switchboard = switchboard::require_switchboard(&txn, uuid).await?;
        switchboard::delete_switchboard(&txn, uuid).await?;
        let event = ConfigEvent::new("switchboard", Deleted, uuid)
            .in_tenant(switchboard.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Creates a call filter.
    #[instrument(skip(self))]
    pub async fn create_callfilter(
        &self,
        tenant_uuid: Uuid,
        name: &str,
        strategy: &str,
    ) -> Result<entities::callfilter::Model> {
        let txn = self.db.begin().await?;
        let callfilter = callfilter::create_callfilter(&txn, tenant_uuid, name, strategy).await?;
        let event = ConfigEvent::new("callfilter", Created, callfilter.id)
            .in_tenant(tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(callfilter)
    }

    /// Deletes a call filter.
    #[instrument(skip(self))]
    pub async fn delete_callfilter(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let callfilter = callfilter::require_callfilter(&txn, id).await?;
        callfilter::delete_callfilter(&txn, id).await?;
        let event = ConfigEvent::new("callfilter", Deleted, id)
            .in_tenant(callfilter.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    // Schedules

    /// Creates a schedule.
    #[instrument(skip(self, args), fields(tenant = %args.tenant_uuid))]
    pub async fn create_schedule(&self, args: ScheduleArgs) -> Result<entities::schedule::Model> {
        let txn = self.db.begin().await?;
        tenant::require_tenant(&txn, args.tenant_uuid).await?;
        let schedule = schedule::create_schedule(&txn, args).await?;
        let event = ConfigEvent::new("schedule", Created, schedule.id)
            .in_tenant(schedule.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(schedule)
    }

    /// Deletes a schedule.
    #[instrument(skip(self))]
    pub async fn delete_schedule(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let schedule = schedule::require_schedule(&txn, id).await?;
        schedule::delete_schedule(&txn, id).await?;
        let event = ConfigEvent::new("schedule", Deleted, id)
            .in_tenant(schedule.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Applies a schedule to an entity.
    #[instrument(skip(self))]
    pub async fn associate_schedule(&self, schedule_id: i32, entity: ScheduledEntity) -> Result<()> {
        let txn = self.db.begin().await?;
        schedule::associate_schedule(&txn, schedule_id, entity).await?;
        let schedule = schedule::require_schedule(&txn, schedule_id).await?;
        let event = ConfigEvent::new("schedule", Associated, schedule_id)
            .in_tenant(schedule.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Removes a schedule from an entity.
    #[instrument(skip(self))]
    pub async fn dissociate_schedule(&self, schedule_id: i32, entity: ScheduledEntity) -> Result<()> {
        let txn = self.db.begin().await?;
        let schedule = schedule::require_schedule(&txn, schedule_id).await?;
        schedule::dissociate_schedule(&txn, schedule_id, entity).await?;
        let event = ConfigEvent::new("schedule", Dissociated, schedule_id)
            .in_tenant(schedule.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    // Extensions

    /// Creates a free extension.
    #[instrument(skip(self))]
    pub async fn create_extension(
        &self,
        tenant_uuid: Uuid,
        context: &str,
        exten: &str,
    ) -> Result<entities::extension::Model> {
        let txn = self.db.begin().await?;
        tenant::require_tenant(&txn, tenant_uuid).await?;
        let extension = extension::create_extension(&txn, tenant_uuid, context, exten).await?;
        let event = ConfigEvent::new("extension", Created, extension.id)
            .in_tenant(tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await?;
        Ok(extension)
    }

    /// Routes an extension to an entity.
    #[instrument(skip(self))]
    pub async fn associate_extension(&self, extension_id: i32, target: ExtensionTarget) -> Result<()> {
        let txn = self.db.begin().await?;
        let extension = extension::associate_extension(&txn, extension_id, target).await?;
        let event = ConfigEvent::new("extension", Associated, extension_id)
            .in_tenant(extension.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Frees an extension routed to an entity.
    #[instrument(skip(self))]
    pub async fn dissociate_extension(&self, extension_id: i32, target: ExtensionTarget) -> Result<()> {
        let txn = self.db.begin().await?;
        let extension = extension::dissociate_extension(&txn, extension_id, target).await?;
        let event = ConfigEvent::new("extension", Dissociated, extension_id)
            .in_tenant(extension.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }

    /// Deletes an extension.
    #[instrument(skip(self))]
    pub async fn delete_extension(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let extension = extension::require_extension(&txn, id).await?;
        extension::delete_extension(&txn, id).await?;
        let event = ConfigEvent::new("extension", Deleted, id)
            .in_tenant(extension.tenant_uuid)
            .reloading(&[Dialplan]);
        self.finish(txn, event).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::sip_options::SectionType;
    use crate::errors::Error;
    use crate::test_utils::*;
    use pretty_assertions::assert_eq;

    async fn setup() -> Result<(Provisioner, Arc<RecordingNotifier>, entities::tenant::Model)> {
        let (db, tenant) = setup_with_tenant().await?;
        let notifier = Arc::new(RecordingNotifier::new());
        let provisioner = Provisioner::new(db, Arc::clone(&notifier) as Arc<dyn Notifier>);
        Ok((provisioner, notifier, tenant))
    }

    #[tokio::test]
    async fn test_endpoint_changes_refresh_view_and_notify() -> Result<()> {
        let (provisioner, notifier, tenant) = setup().await?;

        let template = provisioner
            .create_endpoint(EndpointSipArgs {
                template: true,
                ..EndpointSipArgs::new(tenant.uuid)
                    .with_name("office")
                    .with_option(SectionType::Endpoint, "callerid", "\"Office\" <100>")
            })
            .await?;
        let phone = provisioner
            .create_endpoint(
                EndpointSipArgs::new(tenant.uuid)
                    .with_name("alice")
                    .with_option(SectionType::Auth, "username", "alice")
                    .with_option(SectionType::Auth, "password", "secret"),
            )
            .await?;
        provisioner
            .set_endpoint_templates(phone.uuid, &[template.uuid])
            .await?;

        let view = provisioner.endpoint_options(phone.uuid).await?;
        assert_eq!(view.caller_id(), Some("\"Office\" <100>"));
        assert_eq!(view.password(), Some("secret"));
        assert_eq!(
            provisioner.find_endpoint_by_username("alice").await?,
            Some(phone.clone())
        );

        let events = notifier.events();
        assert_eq!(
            notifier.names(),
            vec![
                "endpoint_sip_created".to_string(),
                "endpoint_sip_created".to_string(),
                "endpoint_sip_templates_associated".to_string(),
            ]
        );
        assert!(events.iter().all(|e| e.reload == vec![ReloadTarget::Pjsip]));
        assert!(events.iter().all(|e| e.tenant_uuid == Some(tenant.uuid)));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_operation_rolls_back_and_stays_silent() -> Result<()> {
        let (provisioner, notifier, tenant) = setup().await?;
        let args = IvrArgs {
            tenant_uuid: tenant.uuid,
            name: "main".to_string(),
            description: None,
            menu_sound: "main-menu".to_string(),
            max_tries: 3,
            choices: vec![
                ("1".to_string(), Destination::Hangup),
                ("1".to_string(), Destination::None),
            ],
        };

        let result = provisioner.create_ivr(args).await;
        assert!(matches!(result, Err(Error::ResourceExists { .. })));
        assert!(ivr::list_ivrs(provisioner.db(), tenant.uuid).await?.is_empty());
        assert!(notifier.events().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cycle_rejected_and_edges_unchanged() -> Result<()> {
        let (provisioner, _notifier, tenant) = setup().await?;
        let base = create_test_template(provisioner.db(), tenant.uuid, "base").await?;
        let derived = create_test_template(provisioner.db(), tenant.uuid, "derived").await?;
        provisioner
            .set_endpoint_templates(derived.uuid, &[base.uuid])
            .await?;

        let result = provisioner
            .set_endpoint_templates(base.uuid, &[derived.uuid])
            .await;
        assert!(matches!(result, Err(Error::TemplateCycle { .. })));
        assert!(
            endpoint_sip::get_templates(provisioner.db(), base.uuid)
                .await?
                .is_empty()
        );
        assert_eq!(
            endpoint_sip::get_templates(provisioner.db(), derived.uuid).await?,
            vec![base]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_set_fallbacks() -> Result<()> {
        let (provisioner, notifier, tenant) = setup().await?;
        let other = provisioner.create_tenant("other", "Other").await?;
        let alice = provisioner.create_user(UserArgs::new(tenant.uuid, "Alice")).await?;
        let queue = provisioner
            .create_queue(tenant.uuid, "support", "Support", None)
            .await?;
        let foreign = provisioner
            .create_queue(other.uuid, "support", "Support", None)
            .await?;
        notifier.clear();

        let owner = DialactionOwner::User(alice.id);
        let mut fallbacks = BTreeMap::new();
        fallbacks.insert(
            "noanswer".to_string(),
            Destination::Queue {
                queue_id: queue.id,
                ring_time: None,
            },
        );
        provisioner.set_fallbacks(owner, &fallbacks).await?;
        assert_eq!(provisioner.fallbacks(owner).await?, fallbacks);

        fallbacks.insert(
            "busy".to_string(),
            Destination::Queue {
                queue_id: foreign.id,
                ring_time: None,
            },
        );
        let result = provisioner.set_fallbacks(owner, &fallbacks).await;
        assert!(matches!(result, Err(Error::DifferentTenants { .. })));
        assert_eq!(provisioner.fallbacks(owner).await?.len(), 1);
        assert_eq!(notifier.names(), vec!["dialaction_edited".to_string()]);

        provisioner.delete_queue(queue.id).await?;
        let rows = dialaction::list_dialactions(provisioner.db(), owner).await?;
        assert!(!rows[0].is_linked());
        Ok(())
    }

    #[tokio::test]
    async fn test_extension_and_schedule_events() -> Result<()> {
        let (provisioner, notifier, tenant) = setup().await?;
        let group = provisioner
            .create_group(tenant.uuid, "sales", "Sales", Some(20))
            .await?;
        let extension = provisioner
            .create_extension(tenant.uuid, "internal", "2000")
            .await?;
        provisioner
            .associate_extension(extension.id, ExtensionTarget::Group(group.id))
            .await?;

        let schedule = provisioner
            .create_schedule(ScheduleArgs {
                tenant_uuid: tenant.uuid,
                name: None,
                timezone: None,
                enabled: true,
                periods: vec![schedule::PeriodArgs::opened("09:00-17:00", "1-5")],
                closed_destination: Destination::Hangup,
            })
            .await?;
        provisioner
            .associate_schedule(schedule.id, ScheduledEntity::Group(group.id))
            .await?;
        provisioner.delete_group(group.id).await?;

        assert_eq!(
            notifier.names(),
            vec![
                "group_created".to_string(),
                "extension_created".to_string(),
                "extension_associated".to_string(),
                "schedule_created".to_string(),
                "schedule_associated".to_string(),
                "group_deleted".to_string(),
            ]
        );
        let freed = extension::require_extension(provisioner.db(), extension.id).await?;
        assert!(!freed.is_associated());
        Ok(())
    }

    #[tokio::test]
    async fn test_ivr_choices_and_incall_reroute() -> Result<()> {
        let (provisioner, notifier, tenant) = setup().await?;
        let alice = provisioner.create_user(UserArgs::new(tenant.uuid, "Alice")).await?;
        let to_alice = Destination::User {
            user_id: alice.id,
            ring_time: None,
        };
        let menu = provisioner
            .create_ivr(IvrArgs {
                tenant_uuid: tenant.uuid,
                name: "main".to_string(),
                description: None,
                menu_sound: "main-menu".to_string(),
                max_tries: 3,
                choices: vec![("0".to_string(), Destination::Hangup)],
            })
            .await?;
        let incall = provisioner
            .create_incall(tenant.uuid, None, &Destination::Hangup)
            .await?;
        notifier.clear();

        provisioner
            .set_ivr_choices(menu.id, &[("1".to_string(), to_alice.clone())])
            .await?;
        let choices: Vec<_> = ivr::get_choices(provisioner.db(), menu.id)
            .await?
            .into_iter()
            .map(|(choice, destination)| (choice.exten, destination))
            .collect();
        assert_eq!(choices, vec![("1".to_string(), Some(to_alice))]);

        let to_menu = Destination::Ivr { ivr_id: menu.id };
        provisioner.set_incall_destination(incall.id, &to_menu).await?;
        assert_eq!(
            incall::get_incall_destination(provisioner.db(), incall.id).await?,
            Some(to_menu)
        );

        let events = notifier.events();
        assert_eq!(
            notifier.names(),
            vec!["ivr_edited".to_string(), "incall_edited".to_string()]
        );
        assert!(events.iter().all(|e| e.reload == vec![ReloadTarget::Dialplan]));

        let missing = Destination::User {
            user_id: 9999,
            ring_time: None,
        };
        let result = provisioner
            .set_ivr_choices(menu.id, &[("2".to_string(), missing)])
            .await;
        assert!(matches!(result, Err(Error::NotFound { resource: "User", .. })));
        assert_eq!(ivr::get_choices(provisioner.db(), menu.id).await?.len(), 1);
        assert_eq!(notifier.events().len(), 2);
        Ok(())
    }
}
