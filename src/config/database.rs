//! Database configuration module.
//!
//! Handles connecting to the configuration database and creating all tables from the
//! entity definitions with `SeaORM`'s `Schema::create_table_from_entity`, so the schema
//! always matches the Rust structs. Production runs on `PostgreSQL`; local runs and
//! tests use `SQLite`.

use crate::entities::{
    Application, CallFilter, Conference, Dialaction, EndpointSip, EndpointSipOptionsView,
    EndpointSipSection, EndpointSipSectionOption, EndpointSipTemplate, Extension, Group, Incall,
    Ivr, IvrChoice, Queue, Schedule, SchedulePath, ScheduleTime, Switchboard, Tenant, Transport,
    User, Voicemail,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::TableCreateStatement,
};
use std::env::VarError;
use std::path::Path;
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/pbx_provd.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back
/// to a local `SQLite` file when it is unset.
///
/// # Errors
/// Returns [`Error::EnvVar`](crate::errors::Error::EnvVar) if the variable is set but
/// not valid unicode.
pub fn get_database_url() -> Result<String> {
    database_url_from(std::env::var("DATABASE_URL"))
}

fn database_url_from(value: std::result::Result<String, VarError>) -> Result<String> {
    match value {
        Ok(url) => Ok(url),
        Err(VarError::NotPresent) => Ok(DEFAULT_DATABASE_URL.to_string()),
        Err(e) => Err(e.into()),
    }
}

/// Establishes a connection to the database named by [`get_database_url`].
///
/// For a file-backed `SQLite` URL the parent directory is created first.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url()?;
    if let Some(parent) = sqlite_file(&database_url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

fn sqlite_file(url: &str) -> Option<&Path> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty() && path != ":memory:").then(|| Path::new(path))
}

fn table<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    schema
        .create_table_from_entity(entity)
        .if_not_exists()
        .to_owned()
}

/// Creates every table that does not exist yet.
///
/// Tables are created in foreign-key order: tenants and transports first, then the
/// rows that reference them.
#[instrument(skip(db))]
pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let statements = [
        table(&schema, Tenant),
        table(&schema, Transport),
        table(&schema, EndpointSip),
        table(&schema, EndpointSipTemplate),
        table(&schema, EndpointSipSection),
        table(&schema, EndpointSipSectionOption),
        table(&schema, EndpointSipOptionsView),
        table(&schema, Voicemail),
        table(&schema, User),
        table(&schema, Group),
        table(&schema, Queue),
        table(&schema, Ivr),
        table(&schema, IvrChoice),
        table(&schema, Incall),
        table(&schema, Conference),
        table(&schema, Application),
        table(&schema, Switchboard),
        table(&schema, CallFilter),
        table(&schema, Schedule),
        table(&schema, ScheduleTime),
        table(&schema, SchedulePath),
        table(&schema, Extension),
        table(&schema, Dialaction),
    ];

    for statement in &statements {
        db.execute(builder.build(statement)).await?;
    }
    info!("Database tables ensured ({} tables)", statements.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        dialaction::Model as DialactionModel, endpoint_sip::Model as EndpointSipModel,
        tenant::Model as TenantModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<TenantModel> = Tenant::find().limit(1).all(&db).await?;
        let _: Vec<EndpointSipModel> = EndpointSip::find().limit(1).all(&db).await?;
        let _: Vec<DialactionModel> = Dialaction::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[test]
    fn test_sqlite_file() {
        assert_eq!(
            sqlite_file("sqlite://data/pbx_provd.sqlite?mode=rwc"),
            Some(Path::new("data/pbx_provd.sqlite"))
        );
        assert_eq!(sqlite_file("sqlite::memory:"), None);
        assert_eq!(sqlite_file("postgres://localhost/asterisk"), None);
    }

    #[test]
    fn test_database_url_fallback() {
        assert_eq!(
            database_url_from(Ok("postgres://localhost/asterisk".to_string())).ok(),
            Some("postgres://localhost/asterisk".to_string())
        );
        assert_eq!(
            database_url_from(Err(VarError::NotPresent)).ok(),
            Some(DEFAULT_DATABASE_URL.to_string())
        );
        let garbled = database_url_from(Err(VarError::NotUnicode("\u{fffd}".into())));
        assert!(matches!(garbled, Err(crate::errors::Error::EnvVar(_))));
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
