//! Maps domain errors to HTTP responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use gate_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable description.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// An error ready to be rendered as an HTTP response.
///
/// Wraps [`AppError`] (axum's `IntoResponse` cannot be implemented for
/// it directly from this crate) and carries the wire-level code plus
/// optional response metadata.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub retry_after_seconds: Option<u64>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
            retry_after_seconds: None,
        }
    }

    /// 401 — no credential cookie on a protected endpoint.
    pub fn token_missing() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "token_missing", "No pass token")
    }

    /// 401 — credential failed unsealing, expiry, or IP binding.
    pub fn token_invalid() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "token_invalid",
            "Invalid or expired token",
        )
    }

    /// 401 — valid credential but no session behind it.
    pub fn session_not_found() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "session_not_found",
            "Session not found",
        )
    }

    /// 410 — the session already reached a terminal state.
    pub fn session_expired(status: &str) -> Self {
        let mut err = Self::new(StatusCode::GONE, "session_expired", "Session expired");
        err.details = Some(serde_json::json!({ "status": status }));
        err
    }

    /// 429 — too many check-in attempts from one client.
    pub fn rate_limited(retry_after_seconds: u64) -> Self {
        let mut err = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "Too many requests",
        );
        err.retry_after_seconds = Some(retry_after_seconds);
        err
    }

    /// 400 — request body failed validation.
    pub fn validation(details: serde_json::Value) -> Self {
        let mut err = Self::new(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Validation failed",
        );
        err.details = Some(details);
        err
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let (status, code) = match err.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation_error"),
            ErrorKind::Authentication => (StatusCode::UNAUTHORIZED, "token_invalid"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "session_not_found"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict"),
            ErrorKind::Session => (StatusCode::GONE, "session_expired"),
            ErrorKind::RateLimit => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ErrorKind::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            ErrorKind::Database
            | ErrorKind::Configuration
            | ErrorKind::Serialization
            | ErrorKind::Internal => {
                tracing::error!(error = %err, "Internal server error");
                return Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    "Internal server error",
                );
            }
        };
        Self::new(status, code, err.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message,
            code: self.code.to_string(),
            details: self.details,
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(seconds) = self.retry_after_seconds {
            if let Ok(value) = seconds.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
