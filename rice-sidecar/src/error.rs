use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(i64),

    #[error("Browser automation error: {0}")]
    BrowserError(String),

    #[error("Invalid request: {0}")]
    ValidationError(String),

    #[error("Recording error: {0}")]
    RecordingError(String),

    #[error("A step group named '{0}' already exists for this user")]
    DuplicateGroup(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    detail: String,
}

impl AppError {
    /// HTTP status and short error label for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::SessionNotFound(_) | AppError::GroupNotFound(_) => {
                (StatusCode::NOT_FOUND, "Not Found")
            }
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            AppError::DuplicateGroup(_) => (StatusCode::CONFLICT, "Duplicate Group"),
            AppError::BrowserError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Browser Error"),
            AppError::RecordingError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Recording Error"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database Error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, label) = self.status();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = Json(ErrorResponse {
            error: label.to_string(),
            detail: self.to_string(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
