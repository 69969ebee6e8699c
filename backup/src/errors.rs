//! Error types for the backup service
//!
//! Every export and restore failure is classified here so the web layer can
//! decide between a recovered table failure, a fatal export failure and an
//! authorization rejection.

use std::fmt;

/// Main error type for export and restore operations
#[derive(Debug)]
pub enum BackupError {
    /// The database could not be reached
    Connection { reason: String },

    /// A catalog or data query failed and is propagated unmodified
    Query(sqlx::Error),

    /// One table's rows could not be fetched or rendered.
    /// Recovered locally by the exporter, never fatal.
    TableSerialization { table: String, reason: String },

    /// The compression sink or its temporary file failed
    ArchiveWrite { reason: String },

    /// The caller lacks a session or the required role
    Authorization(AuthorizationError),

    /// A replayed statement failed
    RestoreExecution {
        statement_index: usize,
        reason: String,
    },

    /// The restore exceeded its wall-clock budget
    RestoreTimeout { seconds: u64 },

    /// Unknown restore mode selector
    InvalidMode { value: String },

    /// The uploaded payload could not be decoded or parsed
    InvalidPayload { reason: String },
}

/// Authorization error variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No bearer token on the request
    MissingCredentials,

    /// Token does not match any configured operator
    InvalidCredentials,

    /// Operator is authenticated but lacks the required role
    InsufficientRole { operator: String, required: String },
}

impl BackupError {
    /// True for errors the caller caused (bad input), as opposed to server failures
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BackupError::InvalidMode { .. } | BackupError::InvalidPayload { .. }
        )
    }
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::Connection { reason } => {
                write!(f, "Database connection failed: {}", reason)
            }
            BackupError::Query(e) => write!(f, "Query failed: {}", e),
            BackupError::TableSerialization { table, reason } => {
                write!(f, "Failed to serialize table '{}': {}", table, reason)
            }
            BackupError::ArchiveWrite { reason } => {
                write!(f, "Failed to write backup archive: {}", reason)
            }
            BackupError::Authorization(e) => write!(f, "{}", e),
            BackupError::RestoreExecution {
                statement_index,
                reason,
            } => {
                write!(
                    f,
                    "Restore failed at statement {}: {}",
                    statement_index, reason
                )
            }
            BackupError::RestoreTimeout { seconds } => {
                write!(f, "Restore timed out after {} seconds", seconds)
            }
            BackupError::InvalidMode { value } => {
                write!(
                    f,
                    "Invalid restore mode '{}': expected one of safe, merge, overwrite",
                    value
                )
            }
            BackupError::InvalidPayload { reason } => {
                write!(f, "Invalid backup payload: {}", reason)
            }
        }
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationError::MissingCredentials => write!(f, "Unauthorized"),
            AuthorizationError::InvalidCredentials => write!(f, "Unauthorized: invalid token"),
            AuthorizationError::InsufficientRole { operator, required } => {
                write!(
                    f,
                    "Forbidden: operator '{}' requires role {}",
                    operator, required
                )
            }
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::Query(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for AuthorizationError {}

// Pool and transport failures mean the database is unreachable; everything
// else is a query error passed through as-is.
impl From<sqlx::Error> for BackupError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => BackupError::Connection {
                reason: err.to_string(),
            },
            other => BackupError::Query(other),
        }
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        BackupError::ArchiveWrite {
            reason: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for BackupError {
    fn from(err: zip::result::ZipError) -> Self {
        BackupError::ArchiveWrite {
            reason: err.to_string(),
        }
    }
}

impl From<AuthorizationError> for BackupError {
    fn from(err: AuthorizationError) -> Self {
        BackupError::Authorization(err)
    }
}
