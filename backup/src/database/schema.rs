//! Catalog queries: table enumeration and primary-key lookup

use serde::Serialize;
use sqlx::{Executor, Row, Sqlite};
use std::fmt;

use crate::constants::sql::PRIMARY_SCHEMA;
use crate::errors::BackupError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
}

impl TableDescriptor {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Quoted `"schema"."name"` form used in generated statements
    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.name)
        )
    }
}

impl fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// List the base tables of the primary schema, sorted by (schema, name).
///
/// SQLite internals and sqlx migration bookkeeping are not user data and
/// are left out.
pub async fn list_tables<'e, E>(executor: E) -> Result<Vec<TableDescriptor>, BackupError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT name
        FROM sqlite_master
        WHERE type = 'table'
        AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
        AND name NOT LIKE '\_sqlx\_%' ESCAPE '\'
        "#,
    )
    .fetch_all(executor)
    .await?;

    let mut tables = rows
        .iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map(|name| TableDescriptor::new(PRIMARY_SCHEMA, name))
        })
        .collect::<Result<Vec<_>, _>>()?;

    tables.sort();
    Ok(tables)
}

/// Primary-key columns of a table in key order; empty for tables without one
pub async fn primary_key_columns<'e, E>(
    executor: E,
    schema: &str,
    table: &str,
) -> Result<Vec<String>, BackupError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT name FROM pragma_table_info(?1, ?2) WHERE pk > 0 ORDER BY pk")
        .bind(table)
        .bind(schema)
        .fetch_all(executor)
        .await?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(BackupError::from))
        .collect()
}
