use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::attachments::AttachmentError;
use crate::auth::AuthError;
use crate::profile::field_path::FieldPathError;
use crate::profile::tabs::TabError;
use crate::profile::validation::ValidationError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many login attempts, retry in {retry_after_secs}s")]
    TooManyAttempts { retry_after_secs: u64 },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    #[error("Persist error: {0}")]
    Persist(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<FieldPathError> for AppError {
    fn from(err: FieldPathError) -> Self {
        match err {
            FieldPathError::NotFound(path) => AppError::NotFound(format!("Field {path} not found")),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<TabError> for AppError {
    fn from(err: TabError) -> Self {
        match err {
            TabError::NotFound(_) => AppError::NotFound(err.to_string()),
            TabError::Builtin(_) => AppError::Conflict(err.to_string()),
            TabError::Validation(e) => e.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::TooManyAttempts { retry_after } => AppError::TooManyAttempts {
                retry_after_secs: retry_after.as_secs().max(1),
            },
            AuthError::Store(e) => AppError::Internal(e),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(format!("Malformed multipart body: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            // Same message for unknown user and wrong password.
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid username or password".to_string(),
            ),
            AppError::TooManyAttempts { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "TOO_MANY_ATTEMPTS",
                format!("Too many failed attempts, try again in {retry_after_secs} seconds"),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "LOGIN_REQUIRED",
                "Authentication required".to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Attachment(err) => {
                let status = match err {
                    AttachmentError::DisallowedType(_) | AttachmentError::MimeMismatch { .. } => {
                        StatusCode::UNSUPPORTED_MEDIA_TYPE
                    }
                    AttachmentError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    AttachmentError::Empty | AttachmentError::InvalidUrl(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    AttachmentError::Transport(msg) => {
                        tracing::error!("Attachment transport error: {msg}");
                        StatusCode::BAD_GATEWAY
                    }
                };
                let message = match err {
                    AttachmentError::Transport(_) => "The file could not be stored".to_string(),
                    other => other.to_string(),
                };
                (status, "ATTACHMENT_ERROR", message)
            }
            AppError::Persist(msg) => {
                tracing::error!("Persist error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PERSIST_ERROR",
                    "Changes are kept but could not be saved yet".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SESSION_STORE_ERROR",
                    "A session storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
