// Error types shared by the HTTP layer

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::models::ErrorResponse;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Backend(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unsupported(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a multipart read failure; body-limit rejections become 413
    pub fn from_multipart(err: MultipartError, limit: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(limit)
        } else {
            AppError::InvalidRequest(err.body_text())
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidInput(msg) => AppError::InvalidRequest(msg),
            StorageError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            StorageError::BackendUnavailable(msg) => AppError::Backend(msg),
            e @ StorageError::Unsupported(_) => AppError::Unsupported(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, "Request failed: {}", self);
        } else {
            warn!(status = %status, "Request rejected: {}", self);
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
