use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use backup::web::start_web_server;
use backup::{BackupService, ConfigManager, Database};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("backup=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting database backup service");

    let config_dir = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let config_manager = ConfigManager::new(config_dir).await?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded: listening on {}:{}, {} operators",
        config.host,
        config.port,
        config.operators.len()
    );

    let database = Arc::new(Database::connect(&config.database_url, config.max_connections).await?);
    database.ping().await?;
    info!("Database initialized");

    let backup_service = Arc::new(BackupService::new(config.clone(), database));
    info!("BackupService initialized");

    start_web_server(config, backup_service).await?;

    Ok(())
}
