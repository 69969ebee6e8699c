// Database export endpoint

use axum::{
    extract::State,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderName, StatusCode,
    },
    response::{IntoResponse, Response},
};

use super::common::ApiError;
use crate::config::{BackupAccess, Role};
use crate::web::{AppState, AuthSession};

pub const BACKUP_TABLES_HEADER: HeaderName = HeaderName::from_static("x-backup-tables");
pub const BACKUP_RECORDS_HEADER: HeaderName = HeaderName::from_static("x-backup-records");

/// Export the whole database as a zip attachment
pub async fn download_backup(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    if state.config.backup_access == BackupAccess::Admin {
        session.require_role(Role::Admin)?;
    }

    let archive = state
        .backup_service
        .create_backup(&session.operator)
        .await?;

    let headers = [
        (CONTENT_TYPE, "application/zip".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", archive.filename),
        ),
        (
            BACKUP_TABLES_HEADER,
            archive.manifest.table_count.to_string(),
        ),
        (
            BACKUP_RECORDS_HEADER,
            archive.manifest.total_records().to_string(),
        ),
    ];

    Ok((StatusCode::OK, headers, archive.bytes).into_response())
}
