use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// One validation failure for a single uploaded file field, so a response can
/// report every bad file at once instead of one per round-trip.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("File validation failed")]
    Files(Vec<FieldError>),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database unavailable")]
    DatabaseUnavailable,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl Error {
    /// The one message every invalid-token shape maps to. Unknown token,
    /// already-consumed token, rejected owner: callers must not be able to
    /// tell them apart.
    pub fn invalid_token() -> Self {
        Error::Forbidden("Invalid or expired access token".to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message, data) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            Error::Files(errors) => {
                let data = json!({ "files": errors });
                (
                    StatusCode::BAD_REQUEST,
                    "One or more uploaded files are invalid".to_string(),
                    Some(data),
                )
            }
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            Error::Multipart(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            Error::DatabaseUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable, please retry later".to_string(),
                None,
            ),
            Error::Database(err) => {
                tracing::error!(error = ?err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
            Error::Io(err) => {
                tracing::error!(error = ?err, "io error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
            Error::Config(msg) | Error::Internal(msg) => {
                tracing::error!(message = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
            Error::Reqwest(err) => {
                tracing::error!(error = ?err, "outbound http error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
            Error::Anyhow(err) => {
                tracing::error!(error = ?err, "unexpected error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({ "success": false, "message": message });
        if let Some(data) = data {
            body["data"] = data;
        }
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::PoolTimedOut => Error::DatabaseUnavailable,
            other => Error::Database(other),
        }
    }
}
