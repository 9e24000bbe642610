//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the PBX configuration tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod application;
pub mod callfilter;
pub mod conference;
pub mod dialaction;
pub mod endpoint_sip;
pub mod endpoint_sip_options_view;
pub mod endpoint_sip_section;
pub mod endpoint_sip_section_option;
pub mod endpoint_sip_template;
pub mod extension;
pub mod group;
pub mod incall;
pub mod ivr;
pub mod ivr_choice;
pub mod queue;
pub mod schedule;
pub mod schedule_path;
pub mod schedule_time;
pub mod switchboard;
pub mod tenant;
pub mod transport;
pub mod user;
pub mod voicemail;

// Re-export specific types to avoid conflicts
pub use application::{Entity as Application, Model as ApplicationModel};
pub use callfilter::{Entity as CallFilter, Model as CallFilterModel};
pub use conference::{Entity as Conference, Model as ConferenceModel};
pub use dialaction::{Column as DialactionColumn, Entity as Dialaction, Model as DialactionModel};
pub use endpoint_sip::{Column as EndpointSipColumn, Entity as EndpointSip, Model as EndpointSipModel};
pub use endpoint_sip_options_view::{Entity as EndpointSipOptionsView, Model as EndpointSipOptionsViewModel};
pub use endpoint_sip_section::{Entity as EndpointSipSection, Model as EndpointSipSectionModel};
pub use endpoint_sip_section_option::{
    Entity as EndpointSipSectionOption, Model as EndpointSipSectionOptionModel,
};
pub use endpoint_sip_template::{Entity as EndpointSipTemplate, Model as EndpointSipTemplateModel};
pub use extension::{Column as ExtensionColumn, Entity as Extension, Model as ExtensionModel};
pub use group::{Entity as Group, Model as GroupModel};
pub use incall::{Entity as Incall, Model as IncallModel};
pub use ivr::{Entity as Ivr, Model as IvrModel};
pub use ivr_choice::{Entity as IvrChoice, Model as IvrChoiceModel};
pub use queue::{Entity as Queue, Model as QueueModel};
pub use schedule::{Entity as Schedule, Model as ScheduleModel};
pub use schedule_path::{Entity as SchedulePath, Model as SchedulePathModel};
pub use schedule_time::{Entity as ScheduleTime, Model as ScheduleTimeModel};
pub use switchboard::{Entity as Switchboard, Model as SwitchboardModel};
pub use tenant::{Entity as Tenant, Model as TenantModel};
pub use transport::{Entity as Transport, Model as TransportModel};
pub use user::{Entity as User, Model as UserModel};
pub use voicemail::{Entity as Voicemail, Model as VoicemailModel};
