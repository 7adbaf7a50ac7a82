//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use modelhub_engine::Error as EngineError;
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Status code for an engine error.
///
/// Failed tests, broken chains and unreadable documents during replay mean the
/// stored history is corrupt, so they are server errors.
fn engine_status(e: &EngineError) -> StatusCode {
    match e.root_cause() {
        EngineError::VersionConflict { .. } => StatusCode::CONFLICT,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidVersion(_)
        | EngineError::InvalidPatch(_)
        | EngineError::InvalidPointer { .. }
        | EngineError::TypeMismatch { .. }
        | EngineError::MissingTestOperation { .. }
        | EngineError::UnsupportedOperation(_) => StatusCode::BAD_REQUEST,
        EngineError::TestFailed { .. }
        | EngineError::BrokenChain { .. }
        | EngineError::InvalidDocument(_)
        | EngineError::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Engine(e) => engine_status(e),
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_message, details) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error".to_string(), None)
            }
            AppError::Engine(e) if status.is_server_error() => {
                tracing::error!("History corrupted: {:?}", e);
                ("Stored history is inconsistent".to_string(), Some(e.to_string()))
            }
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                (e.to_string(), None)
            }
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                (msg.clone(), None)
            }
            AppError::Timeout(msg) => {
                tracing::warn!("Timed out: {}", msg);
                ("Request timed out".to_string(), Some(msg.clone()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), Some(msg.clone()))
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
