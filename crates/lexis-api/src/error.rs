//! API error types and JSON error response formatting.
//!
//! Only transport-level problems become an `ApiError`. A table that fails to
//! load during a chat turn is a normal answer and travels inside the
//! `response` field with status 200.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use lexis_core::error::LexisError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// Source failure kind, when the error came from loading the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid fields, unparsable JSON.
    BadRequest(String),
    /// 500 Internal Server Error.
    Internal(String),
    /// 503 Service Unavailable - the table could not be loaded.
    SourceUnavailable { kind: String, message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, kind) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
            ApiError::SourceUnavailable { kind, message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "source_unavailable",
                message,
                Some(kind),
            ),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            kind,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LexisError> for ApiError {
    fn from(err: LexisError) -> Self {
        match err.kind() {
            Some(kind) => ApiError::SourceUnavailable {
                kind: kind.as_str().to_string(),
                message: err.to_string(),
            },
            None => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
