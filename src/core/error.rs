//! Error types and handling for the public API server.
//!
//! This module provides a unified error type [`AppError`] that wraps various error sources
//! and implements proper HTTP response conversion.
//!
//! Two body shapes are produced:
//! - `{"detail": "..."}` for handler-level failures ([`AppError::Http`]), which the
//!   editor front-end reads directly.
//! - `{"error": {"message", "type", "code"}}` for everything else.

use crate::core::error_types::{
    error_type_for_status, ERROR_CODE_BAD_REQUEST, ERROR_CODE_FORBIDDEN, ERROR_CODE_INTERNAL,
    ERROR_CODE_INVALID_MODEL, ERROR_CODE_MODEL_NOT_FOUND, ERROR_CODE_UNAUTHORIZED,
    ERROR_CODE_UPSTREAM,
};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the application.
///
/// All errors in the application should be converted to this type for consistent handling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (file not found, parse errors, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or mismatched public key
    #[error("Unauthorized")]
    Unauthorized,

    /// Caller is not allowed to use the endpoint
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Client provided invalid data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Requested model is absent from the catalog
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    /// Requested model exists but has the wrong capability for the endpoint
    #[error("Model '{0}' is not a text chat model")]
    InvalidModel(String),

    /// Handler-level failure rendered as `{"detail": ...}`
    #[error("{detail}")]
    Http { status: StatusCode, detail: String },

    /// Application error raised by a collaborator, carrying its own status and code
    #[error("{message}")]
    Service {
        status: Option<StatusCode>,
        code: String,
        message: String,
    },

    /// Upstream provider failure; `status` is the upstream HTTP status when one was received
    #[error("Upstream error: {message}")]
    Upstream { message: String, status: Option<u16> },

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a `{"detail": ...}` error with the given status.
    pub fn http(status: StatusCode, detail: impl Into<String>) -> Self {
        AppError::Http {
            status,
            detail: detail.into(),
        }
    }

    /// Build an upstream error.
    pub fn upstream(message: impl Into<String>, status: Option<u16>) -> Self {
        AppError::Upstream {
            message: message.into(),
            status,
        }
    }

    /// HTTP status this error is rendered with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) | AppError::InvalidModel(_) => StatusCode::BAD_REQUEST,
            AppError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Http { status, .. } => *status,
            AppError::Service { status, .. } => {
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let display = self.to_string();

        let (code, message) = match self {
            AppError::Http { detail, .. } => {
                return (status, Json(json!({ "detail": detail }))).into_response();
            }
            AppError::ModelNotFound(_) => (ERROR_CODE_MODEL_NOT_FOUND.to_string(), display),
            AppError::InvalidModel(_) => (ERROR_CODE_INVALID_MODEL.to_string(), display),
            AppError::Unauthorized => (ERROR_CODE_UNAUTHORIZED.to_string(), display),
            AppError::Forbidden(msg) => (ERROR_CODE_FORBIDDEN.to_string(), msg),
            AppError::BadRequest(msg) => (ERROR_CODE_BAD_REQUEST.to_string(), msg),
            AppError::Service { code, message, .. } => (code, message),
            AppError::Upstream { message, .. } => (ERROR_CODE_UPSTREAM.to_string(), message),
            AppError::Internal(msg) => (ERROR_CODE_INTERNAL.to_string(), msg),
            AppError::Config(_) | AppError::Serialization(_) => {
                (ERROR_CODE_INTERNAL.to_string(), display)
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code = %code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type_for_status(status.as_u16()),
                "code": code
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
