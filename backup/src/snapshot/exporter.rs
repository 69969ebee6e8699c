use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::archive::{archive_filename, ArchiveBuilder, SqlSink};
use super::manifest::{ExportManifest, ManifestBuilder};
use super::serializer;
use crate::database::TableSource;
use crate::errors::BackupError;

/// A finished export, ready to be sent as an attachment
pub struct ExportedArchive {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub manifest: ExportManifest,
}

pub struct BackupExporter<S> {
    source: Arc<S>,
}

impl<S: TableSource> BackupExporter<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Write the full dump into `sink`, one table at a time in enumeration
    /// order.
    ///
    /// A table that fails to fetch or decode gets an inline error comment and
    /// the export moves on. Enumeration, connection and sink failures abort
    /// the export.
    pub async fn export_to<W: SqlSink>(&self, sink: &mut W) -> Result<ExportManifest, BackupError> {
        self.export_at(Utc::now(), sink).await
    }

    pub async fn export_at<W: SqlSink>(
        &self,
        generated_at: DateTime<Utc>,
        sink: &mut W,
    ) -> Result<ExportManifest, BackupError> {
        let tables = self.source.list_tables().await?;
        info!("Exporting {} tables", tables.len());

        sink.write_sql(&serializer::render_header(generated_at, tables.len()))?;
        let mut manifest = ManifestBuilder::new(generated_at, tables.len());

        for table in &tables {
            match self.source.fetch_rows(table).await {
                Ok(rows) => {
                    debug!("Serializing {} rows from {}", rows.len(), table);
                    sink.write_sql(&serializer::render_table_section(table, &rows))?;
                    manifest.record(table, Some(rows.len()));
                }
                Err(e @ BackupError::Connection { .. }) => {
                    error!("Lost database connection while exporting {}: {}", table, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Skipping table {} in export: {}", table, e);
                    sink.write_sql(&serializer::render_failed_section(table, &e))?;
                    manifest.record(table, None);
                }
            }
        }

        sink.write_sql(&serializer::render_footer())?;
        Ok(manifest.finish())
    }

    /// Export into a zip archive staged in `temp_dir` (OS default when `None`)
    pub async fn export_archive(&self, temp_dir: Option<&Path>) -> Result<ExportedArchive, BackupError> {
        let mut archive = ArchiveBuilder::create(temp_dir)?;
        let manifest = self.export_to(&mut archive).await?;
        let sql_bytes = archive.sql_bytes();
        let bytes = archive.finish()?;

        info!(
            "Backup archive ready: {} tables, {} records, {} bytes of SQL compressed to {} bytes",
            manifest.table_count,
            manifest.total_records(),
            sql_bytes,
            bytes.len()
        );

        Ok(ExportedArchive {
            filename: archive_filename(manifest.generated_at),
            bytes,
            manifest,
        })
    }
}
