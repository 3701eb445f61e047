use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// SQLSTATE codes Postgres raises for conflicts that succeed when the transaction is replayed.
const TRANSIENT_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
];

/// Returns true for SQLSTATE codes worth retrying.
pub fn is_transient_sqlstate(code: &str) -> bool {
    TRANSIENT_SQLSTATES.contains(&code)
}

/// RepoError
///
/// Everything the persistence layer can fail with.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not allowed to modify this {0}")]
    Forbidden(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepoError {
    /// Whether replaying the whole transaction may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RepoError::Database(sqlx::Error::PoolTimedOut) => true,
            RepoError::Database(err) => err
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| is_transient_sqlstate(&code)),
            _ => false,
        }
    }
}

/// ApiError
///
/// Handler-level failure. Every variant renders as `{"notes": [message]}` with its own status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            RepoError::Forbidden(what) => {
                ApiError::Forbidden(format!("You are not allowed to modify this {what}"))
            }
            err @ RepoError::Database(_) => {
                // Raw driver messages stay in the logs.
                tracing::error!(error = %err, "note persistence failed");
                if err.is_transient() {
                    ApiError::Unavailable("The database is busy, please retry".to_string())
                } else {
                    ApiError::Internal("Failed to persist the note".to_string())
                }
            }
        }
    }
}

// Extractor rejections describe the client's input, so their text is passed through.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected path parameter");
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            notes: vec![self.to_string()],
        };
        (status, Json(body)).into_response()
    }
}
