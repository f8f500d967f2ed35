//! Error handling for the compliance ledger.
//!
//! One domain error type covers classification-adjacent validation, the
//! access policy and every ledger failure. The HTTP layer converts it into
//! [`crate::api_errors::AppError`].

use crate::policy::{Operation, Role};
use thiserror::Error;

/// Main error type for the compliance ledger
#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Ledger storage operation failed: {operation} - {source}")]
    Database {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// No usable credential was presented.
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// A credential was presented but is invalid or expired.
    #[error("Credential rejected: {message}")]
    InvalidCredential { message: String },

    #[error("Role {role} is not permitted to perform {operation}")]
    Forbidden { role: Role, operation: Operation },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {resource} - {id}")]
    NotFound { resource: String, id: String },

    #[error("Ledger unreachable during {operation}: {message}")]
    Connectivity { operation: String, message: String },

    #[error("Ledger call {operation} timed out after {millis} ms")]
    Timeout { operation: String, millis: u64 },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network operation failed: {operation}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result alias used throughout the crate.
pub type ComplianceResult<T> = Result<T, ComplianceError>;

impl ComplianceError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn database(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Database {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Self::InvalidCredential {
            message: message.into(),
        }
    }

    pub fn forbidden(role: Role, operation: Operation) -> Self {
        Self::Forbidden { role, operation }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn connectivity(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, millis: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis,
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn network(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            operation: operation.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for failures that originate in the ledger rather than the caller.
    pub fn is_ledger_failure(&self) -> bool {
        matches!(
            self,
            ComplianceError::Database { .. }
                | ComplianceError::Serialization { .. }
                | ComplianceError::NotFound { .. }
                | ComplianceError::Connectivity { .. }
                | ComplianceError::Timeout { .. }
                | ComplianceError::Io { .. }
                | ComplianceError::Internal { .. }
        )
    }
}

impl From<sled::Error> for ComplianceError {
    fn from(err: sled::Error) -> Self {
        ComplianceError::database("sled_operation", err)
    }
}

impl From<serde_json::Error> for ComplianceError {
    fn from(err: serde_json::Error) -> Self {
        ComplianceError::serialization("json_operation", err)
    }
}

impl From<std::io::Error> for ComplianceError {
    fn from(err: std::io::Error) -> Self {
        ComplianceError::io("io_operation", err)
    }
}

impl From<reqwest::Error> for ComplianceError {
    fn from(err: reqwest::Error) -> Self {
        ComplianceError::network("http_request", err)
    }
}

impl From<jsonwebtoken::errors::Error> for ComplianceError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ComplianceError::invalid_credential("token has expired")
            }
            _ => ComplianceError::invalid_credential(err.to_string()),
        }
    }
}

impl From<figment::Error> for ComplianceError {
    fn from(err: figment::Error) -> Self {
        ComplianceError::config(err.to_string())
    }
}
