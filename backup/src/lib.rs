pub mod config;
pub mod constants;
pub mod database;
pub mod errors;
pub mod services;
pub mod snapshot;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigManager};
pub use database::Database;
pub use errors::BackupError;
pub use services::BackupService;
pub use snapshot::{BackupExporter, RestoreMode, Restorer};
