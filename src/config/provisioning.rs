//! Seed configuration loading from provisioning.toml
//!
//! This module loads the tenants, SIP transports and SIP templates a fresh installation
//! starts with, and writes the missing ones to the database. Seeding is idempotent:
//! anything that already exists (by slug or name) is left untouched.

use crate::{
    core::{
        endpoint_sip::{self, EndpointSipArgs},
        sip_options::{OptionPair, SectionType},
        tenant, transport,
    },
    errors::{Error, Result},
};
use sea_orm::ConnectionTrait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "provisioning.toml";

/// Configuration structure representing the entire provisioning.toml file
#[derive(Debug, Default, Deserialize)]
pub struct ProvisioningConfig {
    /// Tenants to create
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
    /// SIP transports to create
    #[serde(default)]
    pub transports: Vec<TransportConfig>,
    /// SIP templates to create, parents before children
    #[serde(default)]
    pub sip_templates: Vec<SipTemplateConfig>,
}

/// Configuration for a single tenant
#[derive(Debug, Deserialize, Clone)]
pub struct TenantConfig {
    /// Unique short identifier
    pub slug: String,
    /// Display name
    pub name: String,
}

/// Configuration for a single SIP transport
#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    /// Unique name
    pub name: String,
    /// One of udp, tcp, tls, ws, wss
    pub protocol: String,
}

/// Configuration for a single SIP template
#[derive(Debug, Deserialize, Clone)]
pub struct SipTemplateConfig {
    /// Slug of the owning tenant
    pub tenant: String,
    /// Unique endpoint name
    pub name: String,
    /// Free-form label
    #[serde(default)]
    pub label: Option<String>,
    /// Name of the transport to bind to
    #[serde(default)]
    pub transport: Option<String>,
    /// Names of parent templates, applied in order; later parents override earlier ones
    #[serde(default)]
    pub parents: Vec<String>,
    /// Own options per section, as `[key, value]` pairs
    #[serde(default)]
    pub options: BTreeMap<SectionType, Vec<OptionPair>>,
}

/// What a seeding run created
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    /// Tenants created
    pub tenants: usize,
    /// Transports created
    pub transports: usize,
    /// Templates created
    pub sip_templates: usize,
}

/// Loads provisioning configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A section name is unknown
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ProvisioningConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read {}: {e}", path.as_ref().display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.as_ref().display()),
    })
}

/// Path named by `PROVISIONING_CONFIG`, or ./provisioning.toml
#[must_use]
pub fn config_path() -> PathBuf {
    std::env::var_os("PROVISIONING_CONFIG").map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Writes every missing tenant, transport and template of `config`.
///
/// Run it inside a transaction: a template referencing an unknown tenant, transport or
/// parent fails the whole seed.
pub async fn seed<C: ConnectionTrait>(db: &C, config: &ProvisioningConfig) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for tenant_config in &config.tenants {
        if tenant::get_tenant_by_slug(db, &tenant_config.slug).await?.is_none() {
            tenant::create_tenant(db, &tenant_config.slug, &tenant_config.name).await?;
            report.tenants += 1;
        }
    }

    for transport_config in &config.transports {
        if transport::get_transport_by_name(db, &transport_config.name).await?.is_none() {
            transport::create_transport(db, &transport_config.name, &transport_config.protocol).await?;
            report.transports += 1;
        }
    }

    for template in &config.sip_templates {
        if endpoint_sip::get_endpoint_by_name(db, &template.name).await?.is_some() {
            debug!("Template {} already exists, skipping", template.name);
            continue;
        }
        seed_template(db, template).await?;
        report.sip_templates += 1;
    }

    info!(
        "Seeded {} tenants, {} transports, {} SIP templates",
        report.tenants, report.transports, report.sip_templates
    );
    Ok(report)
}

async fn seed_template<C: ConnectionTrait>(db: &C, template: &SipTemplateConfig) -> Result<()> {
    let tenant = tenant::get_tenant_by_slug(db, &template.tenant)
        .await?
        .ok_or_else(|| Error::not_found("Tenant", &template.tenant))?;
    let transport_uuid = match &template.transport {
        Some(name) => Some(
            transport::get_transport_by_name(db, name)
                .await?
                .ok_or_else(|| Error::not_found("Transport", name))?
                .uuid,
        ),
        None => None,
    };

    let endpoint = endpoint_sip::create_endpoint(
        db,
        EndpointSipArgs {
            name: Some(template.name.clone()),
            label: template.label.clone(),
            transport_uuid,
            template: true,
            sections: template.options.clone(),
            ..EndpointSipArgs::new(tenant.uuid)
        },
    )
    .await?;

    let mut parents = Vec::with_capacity(template.parents.len());
    for name in &template.parents {
        let parent = endpoint_sip::get_endpoint_by_name(db, name)
            .await?
            .ok_or_else(|| Error::not_found("EndpointSIP", name))?;
        parents.push(parent.uuid);
    }
    if !parents.is_empty() {
        endpoint_sip::set_templates(db, endpoint.uuid, &parents).await?;
    }
    Ok(())
}
