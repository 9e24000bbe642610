/// Database configuration and connection management
pub mod database;

/// Seed configuration loading from provisioning.toml
pub mod provisioning;
