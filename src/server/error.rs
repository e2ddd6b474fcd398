use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::document::{ErrorDetail, Rejection};
use crate::storage::StoreError;

/// Errors surfaced by the REST handlers. Every variant renders as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("{detail}")]
    Upload { status: StatusCode, detail: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upload { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        ApiError::BadRequest(rejection.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidName(rejection) => rejection.into(),
            StoreError::NotFound(name) => ApiError::NotFound(name),
            StoreError::Io(e) => ApiError::Internal(e.into()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let detail = if status == StatusCode::PAYLOAD_TOO_LARGE {
            format!("Upload is too large: {}", err.body_text())
        } else {
            format!("Malformed upload: {}", err.body_text())
        };
        ApiError::Upload { status, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::warn!("{}", self);
        }
        (status, Json(ErrorDetail { detail: self.to_string() })).into_response()
    }
}
