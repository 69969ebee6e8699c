use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::TableDescriptor;

/// Metadata describing one export. Built while the export runs and frozen
/// once the last table has been written.
#[derive(Debug, Clone, Serialize)]
pub struct ExportManifest {
    pub generated_at: DateTime<Utc>,
    pub table_count: usize,
    pub tables: Vec<TableRecordCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRecordCount {
    pub table: String,
    /// `None` when the table could not be serialized
    pub records: Option<usize>,
}

impl ExportManifest {
    pub fn total_records(&self) -> usize {
        self.tables.iter().filter_map(|t| t.records).sum()
    }

    pub fn failed_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.records.is_none())
            .map(|t| t.table.as_str())
            .collect()
    }

    /// Statements in the generated SQL: one per record plus the two
    /// integrity-check pragmas that bracket the dump
    pub fn statement_count(&self) -> usize {
        self.total_records() + 2
    }

    pub fn records_for(&self, table: &str) -> Option<usize> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .and_then(|t| t.records)
    }
}

pub(crate) struct ManifestBuilder {
    generated_at: DateTime<Utc>,
    table_count: usize,
    tables: Vec<TableRecordCount>,
}

impl ManifestBuilder {
    pub(crate) fn new(generated_at: DateTime<Utc>, table_count: usize) -> Self {
        Self {
            generated_at,
            table_count,
            tables: Vec::with_capacity(table_count),
        }
    }

    pub(crate) fn record(&mut self, table: &TableDescriptor, records: Option<usize>) {
        self.tables.push(TableRecordCount {
            table: table.to_string(),
            records,
        });
    }

    pub(crate) fn finish(self) -> ExportManifest {
        ExportManifest {
            generated_at: self.generated_at,
            table_count: self.table_count,
            tables: self.tables,
        }
    }
}
