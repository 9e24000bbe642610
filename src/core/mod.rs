//! Core business logic - framework-agnostic provisioning operations.
//!
//! Every function takes a [`sea_orm::ConnectionTrait`] so it runs the same on a pooled
//! connection or inside a transaction opened by the service layer.

pub mod application;
pub mod callfilter;
pub mod conference;
pub mod dialaction;
pub mod endpoint_sip;
pub mod extension;
pub mod group;
pub mod incall;
pub mod ivr;
pub mod queue;
pub mod schedule;
pub mod sip_options;
pub mod switchboard;
pub mod tenant;
pub mod transport;
pub mod user;
pub mod validator;
pub mod voicemail;
