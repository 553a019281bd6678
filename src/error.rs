use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{repository::RepoError, storage::UploadError};

/// AccessError
///
/// Raised only by strict call sites. The access guard itself never fails: a
/// missing profile there is the `Resolving` state, not an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The principal is signed in but no profile has been loaded for it.
    #[error("profile not loaded for the current principal")]
    MissingProfile,
}

/// AppError
///
/// Request-level error type for the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Storage failure. The response carries no detail.
    #[error(transparent)]
    Internal(#[from] RepoError),

    /// Resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Access(AccessError::MissingProfile) => StatusCode::NOT_FOUND,
            Self::Upload(UploadError::InvalidFile(_)) => StatusCode::BAD_REQUEST,
            Self::Upload(UploadError::Failed) => StatusCode::BAD_GATEWAY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (status, body).into_response()
    }
}
