use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};
use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::statements::{self, InsertStatement, Statement};
use crate::constants::archive::{SQL_ENTRY_NAME, ZIP_MAGIC};
use crate::constants::sql::{DISABLE_INTEGRITY_CHECKS, ENABLE_INTEGRITY_CHECKS};
use crate::database::{quote_identifier, schema, Database};
use crate::errors::BackupError;

/// Per-row conflict policy applied while replaying INSERTs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreMode {
    /// Skip rows that collide with an existing key
    Safe,
    /// Update the non-key columns of the existing row
    Merge,
    /// Replace the existing row
    Overwrite,
}

impl RestoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreMode::Safe => "safe",
            RestoreMode::Merge => "merge",
            RestoreMode::Overwrite => "overwrite",
        }
    }

    /// Rewrite an INSERT so conflicts resolve according to this mode.
    /// `primary_key` is only consulted for [`RestoreMode::Merge`].
    pub fn rewrite(&self, insert: &InsertStatement, primary_key: &[String]) -> String {
        let target = insert.target();
        let columns = insert.column_list();
        let skip_conflicts = || {
            format!(
                "INSERT INTO {} ({}) VALUES {} ON CONFLICT DO NOTHING",
                target, columns, insert.values
            )
        };

        match self {
            RestoreMode::Safe => skip_conflicts(),
            RestoreMode::Overwrite => format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES {}",
                target, columns, insert.values
            ),
            RestoreMode::Merge => {
                let updates = insert
                    .columns
                    .iter()
                    .filter(|column| !primary_key.contains(column))
                    .map(|column| {
                        let quoted = quote_identifier(column);
                        format!("{} = excluded.{}", quoted, quoted)
                    })
                    .collect::<Vec<_>>();

                // Nothing to update on, or nothing to update
                if primary_key.is_empty() || updates.is_empty() {
                    return skip_conflicts();
                }

                let conflict_target = primary_key
                    .iter()
                    .map(|column| quote_identifier(column))
                    .collect::<Vec<_>>()
                    .join(", ");

                // The trailing clause skips rows that collide on a secondary
                // unique key
                format!(
                    "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) DO UPDATE SET {} ON CONFLICT DO NOTHING",
                    target,
                    columns,
                    insert.values,
                    conflict_target,
                    updates.join(", ")
                )
            }
        }
    }
}

impl FromStr for RestoreMode {
    type Err = BackupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(RestoreMode::Safe),
            "merge" => Ok(RestoreMode::Merge),
            "overwrite" => Ok(RestoreMode::Overwrite),
            _ => Err(BackupError::InvalidMode {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreSummary {
    pub mode: RestoreMode,
    /// Rows written by INSERT statements (inserted, merged or replaced)
    pub inserted: u64,
    pub statements_executed: usize,
}

/// Turn an upload into SQL text. Raw SQL is the expected input; an archive
/// produced by the exporter is unpacked as well.
pub fn decode_payload(payload: &[u8]) -> Result<String, BackupError> {
    if payload.starts_with(ZIP_MAGIC) {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(payload)).map_err(|e| BackupError::InvalidPayload {
                reason: format!("unreadable zip archive: {}", e),
            })?;
        let mut entry = archive
            .by_name(SQL_ENTRY_NAME)
            .map_err(|e| BackupError::InvalidPayload {
                reason: format!("archive has no {}: {}", SQL_ENTRY_NAME, e),
            })?;
        let mut sql = String::new();
        entry
            .read_to_string(&mut sql)
            .map_err(|e| BackupError::InvalidPayload {
                reason: format!("failed to read {}: {}", SQL_ENTRY_NAME, e),
            })?;
        return Ok(sql);
    }

    let text = std::str::from_utf8(payload).map_err(|e| BackupError::InvalidPayload {
        reason: format!("backup file is not UTF-8 text: {}", e),
    })?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

pub struct Restorer {
    database: Arc<Database>,
}

impl Restorer {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Replay a backup against the live database.
    ///
    /// The whole script is parsed before anything runs. Statements then run
    /// one by one on a single connection and commit individually: a failure
    /// part-way leaves the earlier statements in place.
    pub async fn restore(&self, payload: &[u8], mode: RestoreMode) -> Result<RestoreSummary, BackupError> {
        let sql = decode_payload(payload)?;
        let statements = statements::parse_script(&sql)?;
        info!(
            "Restoring {} statements in {} mode",
            statements.len(),
            mode
        );

        let mut conn = ConnectionGuard::new(self.database.acquire().await?);
        let result = replay(conn.get(), &statements, mode).await;

        // A script may leave integrity checks off, whether it failed or not
        let reenabled = sqlx::query(ENABLE_INTEGRITY_CHECKS)
            .execute(&mut *conn.get())
            .await;
        conn.release();

        match (result, reenabled) {
            (Err(e), reenabled) => {
                if let Err(fk) = reenabled {
                    warn!("Failed to re-enable foreign keys after restore failure: {}", fk);
                }
                Err(e)
            }
            (Ok(_), Err(e)) => Err(BackupError::RestoreExecution {
                statement_index: statements.len() + 1,
                reason: format!("failed to re-enable foreign keys: {}", e),
            }),
            (Ok(summary), Ok(_)) => Ok(summary),
        }
    }
}

/// Holds the restore connection. If the restore future is dropped before
/// [`ConnectionGuard::release`], the connection is closed instead of going
/// back to the pool with whatever pragmas the script left behind.
struct ConnectionGuard {
    conn: PoolConnection<Sqlite>,
    released: bool,
}

impl ConnectionGuard {
    fn new(conn: PoolConnection<Sqlite>) -> Self {
        Self {
            conn,
            released: false,
        }
    }

    fn get(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Return the connection to the pool
    fn release(mut self) {
        self.released = true;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!("Restore cancelled, discarding its database connection");
            self.conn.close_on_drop();
        }
    }
}

async fn replay(
    conn: &mut SqliteConnection,
    statements: &[Statement],
    mode: RestoreMode,
) -> Result<RestoreSummary, BackupError> {
    let mut primary_keys: HashMap<(String, String), Vec<String>> = HashMap::new();
    let mut inserted = 0u64;

    for (i, statement) in statements.iter().enumerate() {
        let statement_index = i + 1;
        let failed = |e: sqlx::Error| BackupError::RestoreExecution {
            statement_index,
            reason: e.to_string(),
        };

        match statement {
            Statement::ForeignKeys(enabled) => {
                let pragma = if *enabled {
                    ENABLE_INTEGRITY_CHECKS
                } else {
                    DISABLE_INTEGRITY_CHECKS
                };
                sqlx::query(pragma)
                    .execute(&mut *conn)
                    .await
                    .map_err(failed)?;
            }
            Statement::Insert(insert) => {
                let key = (
                    insert.schema_or_default().to_string(),
                    insert.table.clone(),
                );
                if mode == RestoreMode::Merge && !primary_keys.contains_key(&key) {
                    let columns = schema::primary_key_columns(&mut *conn, &key.0, &key.1)
                        .await
                        .map_err(|e| BackupError::RestoreExecution {
                            statement_index,
                            reason: e.to_string(),
                        })?;
                    debug!("Primary key of {}.{}: {:?}", key.0, key.1, columns);
                    primary_keys.insert(key.clone(), columns);
                }
                let primary_key = primary_keys.get(&key).map(Vec::as_slice).unwrap_or(&[]);

                let sql = mode.rewrite(insert, primary_key);
                let result = sqlx::query(&sql)
                    .execute(&mut *conn)
                    .await
                    .map_err(failed)?;
                inserted += result.rows_affected();
            }
        }
    }

    Ok(RestoreSummary {
        mode,
        inserted,
        statements_executed: statements.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn insert() -> InsertStatement {
        InsertStatement {
            schema: Some("main".to_string()),
            table: "patients".to_string(),
            columns: vec!["id".to_string(), "name".to_string()],
            values: "(1, 'Amina')".to_string(),
        }
    }

    #[test_case("safe", RestoreMode::Safe ; "lowercase safe")]
    #[test_case("MERGE", RestoreMode::Merge ; "uppercase merge")]
    #[test_case(" overwrite ", RestoreMode::Overwrite ; "padded overwrite")]
    fn test_parse_mode(input: &str, expected: RestoreMode) {
        assert_eq!(input.parse::<RestoreMode>().unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("replace" ; "unknown word")]
    #[test_case("safe,merge" ; "list")]
    fn test_invalid_mode_is_rejected(input: &str) {
        let err = input.parse::<RestoreMode>().unwrap_err();
        assert!(matches!(err, BackupError::InvalidMode { .. }));
    }

    #[test]
    fn test_rewrite_safe() {
        assert_eq!(
            RestoreMode::Safe.rewrite(&insert(), &[]),
            r#"INSERT INTO "main"."patients" ("id", "name") VALUES (1, 'Amina') ON CONFLICT DO NOTHING"#
        );
    }

    #[test]
    fn test_rewrite_overwrite() {
        assert_eq!(
            RestoreMode::Overwrite.rewrite(&insert(), &[]),
            r#"INSERT OR REPLACE INTO "main"."patients" ("id", "name") VALUES (1, 'Amina')"#
        );
    }

    #[test]
    fn test_rewrite_merge_updates_non_key_columns() {
        assert_eq!(
            RestoreMode::Merge.rewrite(&insert(), &["id".to_string()]),
            r#"INSERT INTO "main"."patients" ("id", "name") VALUES (1, 'Amina') ON CONFLICT ("id") DO UPDATE SET "name" = excluded."name" ON CONFLICT DO NOTHING"#
        );
    }

    #[test]
    fn test_rewrite_merge_without_primary_key_skips_conflicts() {
        assert!(RestoreMode::Merge
            .rewrite(&insert(), &[])
            .ends_with("ON CONFLICT DO NOTHING"));
    }

    #[test]
    fn test_decode_raw_sql_strips_bom() {
        let sql = decode_payload("\u{feff}PRAGMA foreign_keys = OFF;".as_bytes()).unwrap();
        assert_eq!(sql, "PRAGMA foreign_keys = OFF;");
    }

    #[test]
    fn test_decode_rejects_binary() {
        let err = decode_payload(&[0xff, 0xfe, 0x00, 0x01]).unwrap_err();
        assert!(err.is_validation());
    }
}
