//! Error types for the tax advisory engine

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type alias for advisory operations
pub type Result<T> = std::result::Result<T, AdvisoryError>;

/// Message shown to callers once the inference provider stays overloaded.
pub const OVERLOADED_MESSAGE: &str = "AI service is too busy. Please try again later.";

#[derive(Error, Debug)]
pub enum AdvisoryError {

    // =============================
    // Pipeline Errors
    // =============================

    #[error("No transactions found for user {0}")]
    NoDataFound(String),

    #[error("Inference provider temporarily unavailable: {0}")]
    TransientUnavailable(String),

    #[error("{}", OVERLOADED_MESSAGE)]
    RetriesExhausted { attempts: u32 },

    #[error("Malformed inference response: {0}")]
    MalformedResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // =============================
    // Unclassified Failures
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AdvisoryError {
    /// Only temporary overload of the inference provider is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, AdvisoryError::TransientUnavailable(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AdvisoryError::NoDataFound(_) => StatusCode::NOT_FOUND,
            AdvisoryError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdvisoryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AdvisoryError::NoDataFound(_) => "No transactions found".to_string(),
            AdvisoryError::InvalidRequest(msg) => msg.clone(),
            other => {
                error!(error = %other, "Request failed");
                other.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
