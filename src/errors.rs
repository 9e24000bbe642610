//! Unified error types and result handling.
//!
//! Validation failures are typed so callers (an HTTP layer, a CLI) can map them
//! onto their own error responses: `NotFound` → 404, `ResourceExists` and
//! `DifferentTenants` → 400, and so on.

use thiserror::Error;
use uuid::Uuid;

/// Every error the provisioning layer can produce
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced resource does not exist (or is not visible in the tenant)
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource kind, e.g. `"EndpointSIP"`
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A uniqueness constraint would be violated
    #[error("{resource} already exists: {key}")]
    ResourceExists {
        /// Resource kind
        resource: &'static str,
        /// The conflicting key, e.g. `"name=default"`
        key: String,
    },

    /// An association crosses tenant boundaries
    #[error("{resource} belongs to a different tenant than {tenant_uuid}")]
    DifferentTenants {
        /// Resource kind that failed the tenant check
        resource: &'static str,
        /// Tenant the operation was scoped to
        tenant_uuid: Uuid,
    },

    /// A field failed validation
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending field
        field: &'static str,
        /// Human readable reason
        message: String,
    },

    /// Dialaction columns do not decode into a known destination
    #[error("invalid destination: {message}")]
    InvalidDestination {
        /// Human readable reason
        message: String,
    },

    /// The event is not allowed for the dialaction category
    #[error("event '{event}' is not valid for category '{category}'")]
    InvalidEvent {
        /// Dialaction category, e.g. `"user"`
        category: String,
        /// Rejected event name
        event: String,
    },

    /// Template inheritance loops back onto itself
    #[error("template cycle detected at endpoint {endpoint}")]
    TemplateCycle {
        /// Endpoint at which the cycle was closed
        endpoint: Uuid,
    },

    /// Template chain is deeper than the resolver allows
    #[error("template chain of endpoint {endpoint} exceeds the maximum depth")]
    TemplateDepthExceeded {
        /// Endpoint whose chain was being resolved
        endpoint: Uuid,
    },

    /// A parent endpoint assigned as template is not flagged as a template
    #[error("endpoint {uuid} is not a template")]
    NotATemplate {
        /// The offending endpoint
        uuid: Uuid,
    },

    /// The resource is already associated elsewhere
    #[error("{resource} {id} is already associated")]
    AlreadyAssociated {
        /// Resource kind
        resource: &'static str,
        /// Identifier of the associated resource
        id: String,
    },

    /// Configuration error with a custom message
    #[error("Configuration error: {message}")]
    Config {
        /// Human readable reason
        message: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON (de)serialization of the materialized options view failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for [`Error::NotFound`]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::ResourceExists`]
    pub fn exists(resource: &'static str, key: impl Into<String>) -> Self {
        Self::ResourceExists {
            resource,
            key: key.into(),
        }
    }

    /// Shorthand for [`Error::InvalidInput`]
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
