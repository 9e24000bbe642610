//! Shared test utilities for `pbx-provd`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        endpoint_sip::{self, EndpointSipArgs},
        tenant,
        user::{self, UserArgs},
    },
    entities,
    errors::Result,
};
use sea_orm::{DatabaseConnection, prelude::Uuid};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a tenant whose name is derived from its slug.
pub async fn create_test_tenant(db: &DatabaseConnection, slug: &str) -> Result<entities::tenant::Model> {
    tenant::create_tenant(db, slug, &format!("Tenant {slug}")).await
}

/// Creates an endpoint from explicit arguments.
pub async fn create_test_endpoint(
    db: &DatabaseConnection,
    args: EndpointSipArgs,
) -> Result<entities::endpoint_sip::Model> {
    endpoint_sip::create_endpoint(db, args).await
}

/// Creates an empty template endpoint.
///
/// # Defaults
/// * no sections
/// * no transport
pub async fn create_test_template(
    db: &DatabaseConnection,
    tenant_uuid: Uuid,
    name: &str,
) -> Result<entities::endpoint_sip::Model> {
    let args = EndpointSipArgs {
        template: true,
        ..EndpointSipArgs::new(tenant_uuid).with_name(name)
    };
    endpoint_sip::create_endpoint(db, args).await
}

/// Creates a user with the default ring time and no voicemail.
pub async fn create_test_user(
    db: &DatabaseConnection,
    tenant_uuid: Uuid,
    firstname: &str,
) -> Result<entities::user::Model> {
    user::create_user(db, UserArgs::new(tenant_uuid, firstname)).await
}

/// Sets up a complete test environment with one tenant.
/// Returns (db, tenant) for common test scenarios.
pub async fn setup_with_tenant() -> Result<(DatabaseConnection, entities::tenant::Model)> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    Ok((db, tenant))
}
