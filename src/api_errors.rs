use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::errors::ComplianceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Map a domain error, hiding server-side detail behind `client_message`.
    ///
    /// A missing record is reported as 500 like any other ledger failure
    /// unless `distinct_not_found` is set.
    pub fn from_domain(err: ComplianceError, client_message: &str, distinct_not_found: bool) -> Self {
        match err {
            ComplianceError::Validation { message, .. } => AppError::BadRequest(message),
            ComplianceError::Auth { message } => AppError::Unauthorized(message),
            ComplianceError::InvalidCredential { message } => AppError::Forbidden(message),
            ComplianceError::Forbidden { .. } => AppError::Forbidden("Forbidden".to_string()),
            ComplianceError::NotFound { resource, id } if distinct_not_found => {
                AppError::NotFound(format!("{resource} {id} not found"))
            }
            other => {
                tracing::error!("{client_message}: {other}");
                AppError::Internal(client_message.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            AppError::Unauthorized(s) => (StatusCode::UNAUTHORIZED, s),
            AppError::Forbidden(s) => (StatusCode::FORBIDDEN, s),
            AppError::NotFound(s) => (StatusCode::NOT_FOUND, s),
            AppError::Internal(s) => (StatusCode::INTERNAL_SERVER_ERROR, s),
        };
        (code, Json(ErrBody { error: msg.clone() })).into_response()
    }
}

impl From<ComplianceError> for AppError {
    fn from(err: ComplianceError) -> Self {
        AppError::from_domain(err, "Internal Server Error", false)
    }
}
