//! Renders tables into the SQL text of a backup.
//!
//! Layout of a dump:
//!
//! ```text
//! -- Database backup
//! -- Generated at: 2024-01-05T10:30:00.000Z
//! -- Total tables: 2
//!
//! PRAGMA foreign_keys = OFF;
//!
//! -- Table: main.logs (0 records)
//! -- No records in main.logs
//!
//! -- Table: main.users (1 records)
//! INSERT INTO "main"."users" ("id", "name") VALUES (1, 'Alice');
//!
//! PRAGMA foreign_keys = ON;
//! ```

use chrono::{DateTime, SecondsFormat, Utc};

use crate::constants::sql::{DISABLE_INTEGRITY_CHECKS, ENABLE_INTEGRITY_CHECKS};
use crate::database::{quote_identifier, render_literal, TableDescriptor, TableRow};
use crate::errors::BackupError;

pub fn render_header(generated_at: DateTime<Utc>, table_count: usize) -> String {
    format!(
        "-- Database backup\n-- Generated at: {}\n-- Total tables: {}\n\n{}\n\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        table_count,
        DISABLE_INTEGRITY_CHECKS
    )
}

pub fn render_footer() -> String {
    format!("{}\n", ENABLE_INTEGRITY_CHECKS)
}

/// Single-line INSERT for one row
pub fn render_insert(table: &TableDescriptor, row: &TableRow) -> String {
    let columns = row
        .column_names()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ");
    let values = row
        .values()
        .map(render_literal)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        table.qualified_name(),
        columns,
        values
    )
}

pub fn render_table_section(table: &TableDescriptor, rows: &[TableRow]) -> String {
    let mut section = format!("-- Table: {} ({} records)\n", table, rows.len());

    if rows.is_empty() {
        section.push_str(&format!("-- No records in {}\n", table));
    }
    for row in rows {
        section.push_str(&render_insert(table, row));
        section.push('\n');
    }

    section.push('\n');
    section
}

/// Inline marker for a table whose rows could not be exported
pub fn render_failed_section(table: &TableDescriptor, error: &BackupError) -> String {
    let message = error.to_string().replace(['\r', '\n'], " ");
    format!(
        "-- Table: {}\n-- ERROR serializing {}: {}\n\n",
        table, table, message
    )
}
