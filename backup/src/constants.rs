//! Central repository for archive names, SQL markers, timeouts and limits

use std::time::Duration;

/// Names and formats of the exported archive
pub mod archive {
    /// The single SQL entry inside every exported zip
    pub const SQL_ENTRY_NAME: &str = "database_backup.sql";

    /// Deflate level used for the SQL entry (maximum, export is infrequent)
    pub const COMPRESSION_LEVEL: i64 = 9;

    /// Prefix of the on-disk temporary archive
    pub const TEMP_FILE_PREFIX: &str = "db-backup-";

    /// Download filename format, rendered from the current UTC time
    pub const FILENAME_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

    /// Local file header magic of a zip archive
    pub const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
}

/// Statements and markers written into the SQL text
pub mod sql {
    /// Primary schema enumerated by the exporter
    pub const PRIMARY_SCHEMA: &str = "main";

    /// Opens the dump: referential-integrity checks off during replay
    pub const DISABLE_INTEGRITY_CHECKS: &str = "PRAGMA foreign_keys = OFF;";

    /// Closes the dump: referential-integrity checks back on
    pub const ENABLE_INTEGRITY_CHECKS: &str = "PRAGMA foreign_keys = ON;";
}

/// Restore limits
pub mod restore {
    use super::Duration;

    /// Wall-clock budget for a single restore
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    /// Largest accepted upload
    pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

    /// Multipart field carrying the SQL payload
    pub const FILE_FIELD: &str = "backupFile";

    /// Multipart field carrying the conflict mode
    pub const MODE_FIELD: &str = "mode";
}

/// Database pool settings
pub mod database {
    use super::Duration;

    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
}
