use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Request-level failure. Every variant renders as `{"success": false,
/// "error": "..."}` with the status the original API used.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed input (400).
    Validation(String),
    /// Target record does not exist (404).
    NotFound(String),
    /// An application already exists for the job; carries the existing row
    /// so the client can show it (400).
    Conflict {
        message: String,
        application: serde_json::Value,
    },
    /// Store rejected the operation (500).
    Database(sea_orm::DbErr),
    /// Ollama could not be reached (500).
    LlmUnreachable(String),
    /// Ollama answered with an empty completion (500).
    LlmEmpty(String),
    /// Ollama answered but the reply was not parseable JSON (500).
    LlmInvalidJson(String),
    /// Anything else that fails server-side, e.g. writing an upload (500).
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "{}", msg),
            AppError::NotFound(what) => write!(f, "{} not found", what),
            AppError::Conflict { message, .. } => write!(f, "{}", message),
            AppError::Database(err) => write!(f, "{}", err),
            AppError::LlmUnreachable(msg) => write!(f, "LLM service unreachable: {}", msg),
            AppError::LlmEmpty(msg) => write!(f, "{}", msg),
            AppError::LlmInvalidJson(msg) => {
                write!(f, "Failed to parse JSON from Ollama response: {}", msg)
            }
            AppError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::Conflict { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::LlmUnreachable(_)
            | AppError::LlmEmpty(_)
            | AppError::LlmInvalidJson(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            AppError::Conflict { application, .. } => Json(json!({
                "success": false,
                "error": self.to_string(),
                "application": application,
            })),
            _ => Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        };

        (status, body).into_response()
    }
}
