use super::{Config, OperatorConfig};
use anyhow::{anyhow, Result};
use glob::glob;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/main.toml", config_dir);
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path, e))?;

        let mut config: Config = toml::from_str(&main_config_content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("Using database URL from {}", DATABASE_URL_ENV);
                config.database_url = url;
            }
        }

        // Every other *.toml in the directory describes one operator
        let pattern = format!("{}/*.toml", config_dir);
        let mut operators = HashMap::new();

        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?;

            if filename == "main.toml" {
                continue;
            }

            let operator_name = filename
                .strip_suffix(".toml")
                .ok_or_else(|| anyhow!("Invalid config filename: {}", filename))?;

            debug!("Loading operator config: {}", path.display());

            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

            let operator: OperatorConfig = toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;

            if operator.token.trim().is_empty() {
                return Err(anyhow!("Operator '{}' has an empty token", operator_name));
            }

            operators.insert(operator_name.to_string(), operator);
        }

        if operators.is_empty() {
            warn!("No operators configured - every backup and restore request will be rejected");
        }

        config.operators = operators;

        info!(
            "Loaded configuration: {} operators, backup access {:?}, restore timeout {}s",
            config.operators.len(),
            config.backup_access,
            config.restore_timeout_seconds
        );

        Ok(config)
    }
}
