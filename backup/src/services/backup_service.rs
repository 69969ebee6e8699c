use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::Database;
use crate::errors::BackupError;
use crate::snapshot::{BackupExporter, ExportedArchive, RestoreMode, RestoreSummary, Restorer};

/// Export and restore entry points used by the web layer. Every run gets an
/// operation id so its log lines can be followed.
#[derive(Clone)]
pub struct BackupService {
    config: Arc<Config>,
    database: Arc<Database>,
    exporter: Arc<BackupExporter<Database>>,
    restorer: Arc<Restorer>,
}

impl BackupService {
    pub fn new(config: Arc<Config>, database: Arc<Database>) -> Self {
        Self {
            exporter: Arc::new(BackupExporter::new(database.clone())),
            restorer: Arc::new(Restorer::new(database.clone())),
            config,
            database,
        }
    }

    pub async fn create_backup(&self, requested_by: &str) -> Result<ExportedArchive, BackupError> {
        let operation_id = Uuid::new_v4();
        info!(%operation_id, "Database export requested by {}", requested_by);

        let temp_dir = self.config.temp_dir.as_deref().map(Path::new);
        match self.exporter.export_archive(temp_dir).await {
            Ok(archive) => {
                let failed = archive.manifest.failed_tables();
                if !failed.is_empty() {
                    warn!(
                        %operation_id,
                        "Export completed with {} unreadable tables: {}",
                        failed.len(),
                        failed.join(", ")
                    );
                }
                info!(
                    %operation_id,
                    "Export {} completed: {} tables, {} records",
                    archive.filename,
                    archive.manifest.table_count,
                    archive.manifest.total_records()
                );
                Ok(archive)
            }
            Err(e) => {
                error!(%operation_id, "Export failed: {}", e);
                Err(e)
            }
        }
    }

    /// Replay an uploaded backup. Exceeding the configured wall-clock budget
    /// is a hard failure; whatever already ran stays committed.
    pub async fn restore_backup(
        &self,
        payload: &[u8],
        mode: RestoreMode,
        requested_by: &str,
    ) -> Result<RestoreSummary, BackupError> {
        let operation_id = Uuid::new_v4();
        let seconds = self.config.restore_timeout_seconds;
        info!(
            %operation_id,
            "Restore requested by {} in {} mode ({} bytes)",
            requested_by,
            mode,
            payload.len()
        );

        let outcome = tokio::time::timeout(
            Duration::from_secs(seconds),
            self.restorer.restore(payload, mode),
        )
        .await;

        match outcome {
            Ok(Ok(summary)) => {
                info!(
                    %operation_id,
                    "Restore completed: {} statements, {} rows written",
                    summary.statements_executed,
                    summary.inserted
                );
                Ok(summary)
            }
            Ok(Err(e)) => {
                error!(%operation_id, "Restore failed: {}", e);
                Err(e)
            }
            Err(_) => {
                error!(%operation_id, "Restore timed out after {}s", seconds);
                Err(BackupError::RestoreTimeout { seconds })
            }
        }
    }

    pub async fn check_database(&self) -> Result<(), BackupError> {
        self.database.ping().await
    }
}
