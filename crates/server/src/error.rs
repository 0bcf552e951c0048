//! HTTP error responses
//!
//! Every error body has the same shape:
//!
//! ```json
//! {"statusCode": 404, "error": "Not Found", "message": "no state found for ..."}
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use grantstate_executor::Error as CommandError;
use serde_json::json;
use thiserror::Error;

use crate::routes::json_response;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure from validation or execution
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Missing or wrong credentials
    #[error("Missing authentication")]
    Unauthorized,

    /// Body is not parseable JSON
    #[error("Invalid request payload JSON format")]
    InvalidJson,

    /// Query string could not be decoded
    #[error("Invalid request query input")]
    InvalidQuery,
}

impl ApiError {
    /// Response status
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Command(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidJson | ApiError::InvalidQuery => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message
    pub fn message(&self) -> String {
        match self {
            ApiError::Command(CommandError::Internal { .. }) => {
                "An internal server error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        json_response(
            status,
            &json!({
                "statusCode": status.as_u16(),
                "error": status.canonical_reason().unwrap_or("Unknown"),
                "message": self.message(),
            }),
        )
    }
}
