pub mod manager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
pub use manager::ConfigManager;

use crate::constants;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Overridden by the DATABASE_URL environment variable when set
    pub database_url: String,
    #[serde(default)]
    pub backup_access: BackupAccess,
    #[serde(default = "default_restore_timeout")]
    pub restore_timeout_seconds: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Directory for temporary archives, OS default when unset
    pub temp_dir: Option<String>,
    // Populated from individual operator files
    #[serde(skip)]
    pub operators: HashMap<String, OperatorConfig>,
}

/// Who may download a backup. Restore always requires an administrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupAccess {
    #[default]
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    pub token: String,
    pub role: Role,
}

fn default_restore_timeout() -> u64 {
    constants::restore::DEFAULT_TIMEOUT.as_secs()
}

fn default_max_upload_bytes() -> usize {
    constants::restore::DEFAULT_MAX_UPLOAD_BYTES
}

fn default_max_connections() -> u32 {
    constants::database::DEFAULT_MAX_CONNECTIONS
}

impl Config {
    /// Resolve a bearer token to the operator it belongs to
    pub fn find_operator(&self, token: &str) -> Option<(&str, &OperatorConfig)> {
        self.operators
            .iter()
            .find(|(_, operator)| operator.token == token)
            .map(|(name, operator)| (name.as_str(), operator))
    }
}
