// Backup restore endpoint

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    response::Json,
};
use serde::Serialize;
use tracing::debug;

use super::common::ApiError;
use crate::constants::restore::{FILE_FIELD, MODE_FIELD};
use crate::snapshot::RestoreMode;
use crate::web::{AdminSession, AppState};

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub success: bool,
    pub inserted: u64,
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), format!("Invalid upload: {}", e.body_text()))
}

/// Replay an uploaded SQL backup. Administrators only.
pub async fn restore_backup(
    AdminSession(session): AdminSession,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RestoreResponse>, ApiError> {
    let mut payload: Option<Vec<u8>> = None;
    let mut mode: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                payload = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            Some(MODE_FIELD) => {
                mode = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let payload = payload
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::bad_request("No backup file uploaded"))?;
    let mode: RestoreMode = mode.as_deref().unwrap_or_default().parse()?;

    let summary = state
        .backup_service
        .restore_backup(&payload, mode, &session.operator)
        .await?;

    Ok(Json(RestoreResponse {
        success: true,
        inserted: summary.inserted,
    }))
}
