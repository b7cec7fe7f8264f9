//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;
use vshop_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

static REDACT_INTERNAL: OnceLock<bool> = OnceLock::new();

/// Hide internal error details from response bodies. Takes effect once.
pub fn redact_internal_errors(enabled: bool) {
    let _ = REDACT_INTERNAL.set(enabled);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Worker error: {0}")]
    Worker(WorkerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload(_) | ApiError::Worker(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Response body text.
    fn detail(&self, redact_internal: bool) -> String {
        if redact_internal && self.is_internal() {
            return "An internal error occurred".to_string();
        }
        match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(e: WorkerError) -> Self {
        match e {
            WorkerError::VideoNotFound(_) => ApiError::NotFound("Video not found".to_string()),
            other => ApiError::Worker(other),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.detail(REDACT_INTERNAL.get().copied().unwrap_or(false));
        (self.status_code(), Json(ErrorResponse { detail })).into_response()
    }
}
