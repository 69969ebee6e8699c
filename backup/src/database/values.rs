//! Tagged column values and their SQL literal rendering.
//!
//! SQLite rows are dynamically typed, so every column is decoded into a
//! [`SqlValue`] using the declared column type first (booleans, timestamps)
//! and the storage class of the value second.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Blob(Vec<u8>),
}

/// One fetched row: column names in select order, each with its value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub columns: Vec<(String, SqlValue)>,
}

impl TableRow {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.columns.iter().map(|(_, value)| value)
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

/// Render a value as a SQL literal.
///
/// Strings only get their single quotes doubled. Backup files are replayed
/// by the restore pipeline alone, under administrator control.
pub fn render_literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Text(text) => quote_string(text),
        SqlValue::Integer(n) => n.to_string(),
        SqlValue::Real(r) => render_real(*r),
        SqlValue::Boolean(true) => "TRUE".to_string(),
        SqlValue::Boolean(false) => "FALSE".to_string(),
        SqlValue::DateTime(ts) => quote_string(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        SqlValue::Blob(bytes) => {
            let mut literal = String::with_capacity(bytes.len() * 2 + 3);
            literal.push_str("X'");
            for byte in bytes {
                let _ = write!(literal, "{:02X}", byte);
            }
            literal.push('\'');
            literal
        }
    }
}

pub fn quote_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn render_real(value: f64) -> String {
    if value.is_nan() {
        "NULL".to_string()
    } else if value.is_infinite() {
        // SQLite reads out-of-range literals as +/-Inf
        if value > 0.0 { "9e999" } else { "-9e999" }.to_string()
    } else {
        value.to_string()
    }
}

/// Decode every column of a fetched row
pub fn decode_row(row: &SqliteRow) -> Result<TableRow, sqlx::Error> {
    let mut columns = Vec::with_capacity(row.len());
    for column in row.columns() {
        let value = decode_column(row, column.ordinal())?;
        columns.push((column.name().to_string(), value));
    }
    Ok(TableRow { columns })
}

fn decode_column(row: &SqliteRow, index: usize) -> Result<SqlValue, sqlx::Error> {
    let storage = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };
    let declared = row.column(index).type_info().name().to_ascii_uppercase();

    match declared.as_str() {
        // Only 0/1 integers are booleans; anything else keeps its storage class
        "BOOLEAN" | "BOOL" if storage == "INTEGER" => {
            match row.try_get_unchecked::<i64, _>(index)? {
                0 => return Ok(SqlValue::Boolean(false)),
                1 => return Ok(SqlValue::Boolean(true)),
                _ => {}
            }
        }
        "DATETIME" | "TIMESTAMP" => {
            if let Some(ts) = decode_timestamp(row, index) {
                return Ok(SqlValue::DateTime(ts));
            }
        }
        "DATE" => {
            if let Some(midnight) = row
                .try_get_unchecked::<NaiveDate, _>(index)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
            {
                return Ok(SqlValue::DateTime(midnight.and_utc()));
            }
        }
        _ => {}
    }

    let value = match storage.as_str() {
        "INTEGER" => SqlValue::Integer(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => SqlValue::Real(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

// Timestamp columns hold whatever the application wrote: RFC 3339, naive
// "YYYY-MM-DD HH:MM:SS" or unix seconds. Naive values are taken as UTC.
fn decode_timestamp(row: &SqliteRow, index: usize) -> Option<DateTime<Utc>> {
    if let Ok(ts) = row.try_get_unchecked::<DateTime<Utc>, _>(index) {
        return Some(ts);
    }
    row.try_get_unchecked::<NaiveDateTime, _>(index)
        .ok()
        .map(|naive| naive.and_utc())
}
