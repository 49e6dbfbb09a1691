use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::{debug, warn};

#[derive(Debug, ThisError)]
pub enum PersistError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No person with id {0}")]
    NotFound(i64),

    #[error("An edit is in progress; finish or cancel it first")]
    EditInProgress,

    #[error("No edit in progress")]
    NotEditing,

    #[error("No pending confirmation with token {0}")]
    UnknownConfirmation(u64),

    #[error("Invalid secure store key: {0:?}")]
    InvalidKey(String),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Secure store error: {0}")]
    SecureStore(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Actor error: {0}")]
    Actor(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl PersistError {
    /// Bad input or a gated action; nothing reached storage.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PersistError::Validation(_)
                | PersistError::EditInProgress
                | PersistError::NotEditing
                | PersistError::InvalidKey(_)
        )
    }
}

impl From<figment::Error> for PersistError {
    fn from(e: figment::Error) -> Self {
        PersistError::Config(Box::new(e))
    }
}

impl IntoResponse for PersistError {
    fn into_response(self) -> axum::response::Response {
        if self.is_user_error() {
            debug!(error = %self, "request rejected");
        } else {
            warn!(error = %self, "request failed");
        }

        let (status, code) = match &self {
            PersistError::Validation(_) | PersistError::InvalidKey(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            PersistError::EditInProgress => (StatusCode::CONFLICT, "EDIT_IN_PROGRESS"),
            PersistError::NotEditing => (StatusCode::CONFLICT, "NOT_EDITING"),
            PersistError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            PersistError::UnknownConfirmation(_) => {
                (StatusCode::NOT_FOUND, "UNKNOWN_CONFIRMATION")
            }
            PersistError::Database(_)
            | PersistError::SecureStore(_)
            | PersistError::Crypto(_)
            | PersistError::Io(_)
            | PersistError::Json(_)
            | PersistError::Actor(_)
            | PersistError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        };

        // Storage internals stay in the log; the caller only learns the class.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "A storage error occurred.".to_string()
        } else {
            self.to_string()
        };

        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
