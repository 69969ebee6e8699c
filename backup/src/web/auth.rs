//! Session extractors for the backup routes
//!
//! Sessions come from `Authorization: Bearer <token>` headers matched against
//! the configured operators. Extraction fails before the handler body runs,
//! so a rejected request never reaches the database.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::config::Role;
use crate::errors::AuthorizationError;
use crate::web::handlers::common::ApiError;
use crate::web::AppState;

/// Any authenticated operator
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub operator: String,
    pub role: Role,
}

impl AuthSession {
    pub fn require_role(&self, required: Role) -> Result<(), AuthorizationError> {
        if self.role == required {
            Ok(())
        } else {
            Err(AuthorizationError::InsufficientRole {
                operator: self.operator.clone(),
                required: required.as_str().to_string(),
            })
        }
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        let Some(token) = token else {
            return Err(AuthorizationError::MissingCredentials.into());
        };

        match state.config.find_operator(token) {
            Some((name, operator)) => Ok(AuthSession {
                operator: name.to_string(),
                role: operator.role,
            }),
            None => {
                warn!("Rejected request to {} with unknown token", parts.uri.path());
                Err(AuthorizationError::InvalidCredentials.into())
            }
        }
    }
}

/// An authenticated operator with the ADMIN role
#[derive(Debug, Clone)]
pub struct AdminSession(pub AuthSession);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        if let Err(e) = session.require_role(Role::Admin) {
            warn!("{} denied access to {}", session.operator, parts.uri.path());
            return Err(e.into());
        }
        Ok(AdminSession(session))
    }
}
