//! Database layer for the backup service.
//!
//! - `schema` - catalog enumeration and primary-key lookup
//! - `values` - tagged column values and SQL literal rendering
//!
//! [`Database`] is passed explicitly to the exporter and restorer; each
//! request acquires what it needs from the pool and releases it on return.

pub mod schema;
pub mod values;

pub use schema::{quote_identifier, TableDescriptor};
pub use values::{render_literal, SqlValue, TableRow};

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, error, info};

use crate::constants;
use crate::errors::BackupError;

/// Where the exporter reads tables and rows from
pub trait TableSource {
    fn list_tables(&self) -> impl Future<Output = Result<Vec<TableDescriptor>, BackupError>> + Send;

    fn fetch_rows(
        &self,
        table: &TableDescriptor,
    ) -> impl Future<Output = Result<Vec<TableRow>, BackupError>> + Send;
}

pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, BackupError> {
        info!("Connecting to database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| BackupError::Connection {
                reason: format!("invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(constants::database::ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("FAILED to connect to database: {}", e);
                BackupError::Connection {
                    reason: e.to_string(),
                }
            })?;

        info!("Successfully connected to SQLite database");
        Ok(Self { pool })
    }

    /// Acquire one connection for work that relies on per-connection state
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, BackupError> {
        self.pool.acquire().await.map_err(|e| BackupError::Connection {
            reason: e.to_string(),
        })
    }

    pub async fn ping(&self) -> Result<(), BackupError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl TableSource for Database {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>, BackupError> {
        let mut conn = self.acquire().await?;
        schema::list_tables(&mut *conn).await
    }

    async fn fetch_rows(&self, table: &TableDescriptor) -> Result<Vec<TableRow>, BackupError> {
        let sql = format!("SELECT * FROM {}", table.qualified_name());
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        debug!("Fetched {} rows from {}", rows.len(), table);

        rows.iter()
            .map(|row| {
                values::decode_row(row).map_err(|e| BackupError::TableSerialization {
                    table: table.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}
