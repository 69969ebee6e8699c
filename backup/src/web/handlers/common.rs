// Common types and utilities for API handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;

use crate::errors::{AuthorizationError, BackupError};

// Helper type for API responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Failure body shared by every route: `{ "success": false, "error": "..." }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

pub fn status_for(err: &BackupError) -> StatusCode {
    match err {
        BackupError::Authorization(AuthorizationError::InsufficientRole { .. }) => {
            StatusCode::FORBIDDEN
        }
        BackupError::Authorization(_) => StatusCode::UNAUTHORIZED,
        BackupError::InvalidMode { .. } | BackupError::InvalidPayload { .. } => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<BackupError> for ApiError {
    fn from(err: BackupError) -> Self {
        Self::new(status_for(&err), err.to_string())
    }
}

impl From<AuthorizationError> for ApiError {
    fn from(err: AuthorizationError) -> Self {
        BackupError::Authorization(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}
