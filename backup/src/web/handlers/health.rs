use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::error;

use super::common::{ApiError, ApiResponse, ApiResult};
use crate::web::AppState;

/// Liveness probe including a database round trip
pub async fn get_health(State(state): State<AppState>) -> ApiResult<Value> {
    match state.backup_service.check_database().await {
        Ok(()) => Ok(Json(ApiResponse::success(json!({
            "status": "ok",
            "database": "reachable"
        })))),
        Err(e) => {
            error!("Health check failed: {}", e);
            Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}
