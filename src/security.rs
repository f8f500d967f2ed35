use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::api_errors::AppError;
use crate::app_state::AppState;
use crate::policy::{authorize, bearer_token, Claims, Operation};

/// Caller identity taken from the bearer credential.
///
/// A missing or non-Bearer header is rejected with 401, an invalid or
/// expired token with 403.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub claims: Claims,
}

impl CurrentUser {
    pub fn require(&self, operation: Operation) -> Result<(), AppError> {
        authorize(&self.claims, operation).map_err(AppError::from)
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = bearer_token(header)?;
        let claims = state.tokens.validate(token).map_err(|e| {
            tracing::warn!("Rejected credential: {e}");
            AppError::from(e)
        })?;
        Ok(CurrentUser { claims })
    }
}
