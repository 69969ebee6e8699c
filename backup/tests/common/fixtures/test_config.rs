//! Test configuration builders

use backup::config::{BackupAccess, Config, OperatorConfig, Role};
use std::collections::HashMap;
use std::sync::Arc;

use super::test_data::{ADMIN_TOKEN, STAFF_TOKEN};

pub struct TestConfigBuilder {
    config: Config,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    /// Config with one ADMIN operator (`admin`) and one STAFF operator (`reception`)
    pub fn new() -> Self {
        let mut operators = HashMap::new();
        operators.insert(
            "admin".to_string(),
            OperatorConfig {
                token: ADMIN_TOKEN.to_string(),
                role: Role::Admin,
            },
        );
        operators.insert(
            "reception".to_string(),
            OperatorConfig {
                token: STAFF_TOKEN.to_string(),
                role: Role::Staff,
            },
        );

        Self {
            config: Config {
                host: "127.0.0.1".to_string(),
                port: 0,
                database_url: "sqlite::memory:".to_string(),
                backup_access: BackupAccess::Authenticated,
                restore_timeout_seconds: 300,
                max_upload_bytes: 16 * 1024 * 1024,
                max_connections: 1,
                temp_dir: None,
                operators,
            },
        }
    }

    pub fn backup_access(mut self, access: BackupAccess) -> Self {
        self.config.backup_access = access;
        self
    }

    pub fn temp_dir(mut self, dir: &str) -> Self {
        self.config.temp_dir = Some(dir.to_string());
        self
    }

    pub fn restore_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.restore_timeout_seconds = seconds;
        self
    }

    pub fn build(self) -> Arc<Config> {
        Arc::new(self.config)
    }
}
