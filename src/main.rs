use dotenvy::dotenv;
use pbx_provd::{
    config::{database, provisioning},
    errors::Result,
    service::{LogNotifier, Provisioner},
};
use sea_orm::TransactionTrait;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Connect and make sure every table exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to the database: {}", e))?;
    database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    // 4. Seed tenants, transports and SIP templates
    let config_path = provisioning::config_path();
    if config_path.exists() {
        let config = provisioning::load_config(&config_path)?;
        let txn = db.begin().await?;
        let report = provisioning::seed(&txn, &config)
            .await
            .inspect_err(|e| error!("Failed to seed provisioning config: {}", e))?;
        txn.commit().await?;
        info!(?report, "Provisioning config applied.");
    } else {
        warn!("No provisioning config at {}, skipping seed.", config_path.display());
    }

    // 5. Rebuild the options view so it reflects the current templates
    let provisioner = Provisioner::new(db, Arc::new(LogNotifier));
    let count = provisioner.refresh_options_view().await?;
    info!("Ready: {} SIP endpoints resolved.", count);

    Ok(())
}
