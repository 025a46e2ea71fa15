//! Error types for expel-api
//!
//! Every error response body is `{ "error": "<message>" }`. Detection
//! failures never expose their cause to the client; the cause is logged here.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::IngestionError;

/// Message returned for every failed detection
pub const DETECTION_FAILURE_MESSAGE: &str = "Internal detection failure";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Upload request without an `image` part (400)
    #[error("No image provided")]
    NoImageProvided,

    /// Malformed or oversized multipart body (axum's status, 400 or 413)
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    /// Any ingestion pipeline failure (500, opaque to the client)
    #[error("Detection failed: {0}")]
    Detection(#[from] IngestionError),

    /// expel-common error (500)
    #[error("Common error: {0}")]
    Common(#[from] expel_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NoImageProvided => (StatusCode::BAD_REQUEST, "No image provided".to_string()),
            ApiError::Multipart(err) => (err.status(), err.body_text()),
            ApiError::Detection(ref err) => {
                tracing::error!(
                    failed_at = %err.failed_transition(),
                    "DETECTION ERROR: {}",
                    err
                );
                (StatusCode::INTERNAL_SERVER_ERROR, DETECTION_FAILURE_MESSAGE.to_string())
            }
            ApiError::Common(ref err) => {
                tracing::error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::GatewayError;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::NoImageProvided.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Detection(IngestionError::Gateway(GatewayError::InvalidApiKey))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Common(expel_common::Error::Internal("boom".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
