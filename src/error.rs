use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::io;

/// Message returned when a push hook targets a project that cannot consume it
pub const UNSUPPORTED_CONSUMER_MESSAGE: &str = "Push Hook is not supported for this project";

/// Custom error type for push_hook_gate operations
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("{message}")]
    UnsupportedConsumer { message: String },

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Unauthorized delivery: {0}")]
    Unauthorized(String),

    #[error("Invalid push payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

impl GateError {
    pub fn unsupported_consumer() -> Self {
        GateError::UnsupportedConsumer {
            message: UNSUPPORTED_CONSUMER_MESSAGE.to_string(),
        }
    }

    /// HTTP status the webhook endpoint answers with for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::UnsupportedConsumer { .. } => StatusCode::CONFLICT,
            GateError::ProjectNotFound(_) => StatusCode::NOT_FOUND,
            GateError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GateError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            GateError::ConfigError(_) | GateError::IoError(_) | GateError::TomlParseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({"error": self.to_string()}))).into_response()
    }
}

/// Helper type for Results that use GateError
pub type Result<T> = std::result::Result<T, GateError>;
