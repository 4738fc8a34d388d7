//! Error types for planlytics-gateway
//!
//! Every error leaves the gateway as `{"error": "<message>"}`, which is the
//! shape the client's response parser looks for first.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use planlytics_common::api::ErrorResponse;
use thiserror::Error;

use crate::llm::LlmError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Upload over the configured limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Chat quota exhausted (429)
    #[error("{0}")]
    RateLimited(String),

    /// LLM backend failure (502)
    #[error("{0}")]
    Upstream(#[from] LlmError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// planlytics-common error
    #[error("{0}")]
    Common(#[from] planlytics_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use planlytics_common::Error as CommonError;

        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Common(CommonError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
