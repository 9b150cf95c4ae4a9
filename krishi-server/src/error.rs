use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use krishi_core::{UpstreamError, ValidationError};

/// Error answered as `{ "error": ..., "message": ... }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
            "Only POST requests are allowed",
        )
    }

    /// Transport failures shared by every hard-failing endpoint.
    pub fn from_transport(err: &UpstreamError, service: &str) -> Option<Self> {
        match err {
            UpstreamError::Timeout(_) => Some(Self::new(
                StatusCode::REQUEST_TIMEOUT,
                "Request timeout",
                format!("{service} took too long to respond"),
            )),
            UpstreamError::Unreachable { .. } => Some(Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable",
                format!("Unable to connect to {service}"),
            )),
            _ => None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            message,
        )
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.title(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, message = %self.message, "request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.error, message = %self.message, "request rejected");
        }

        let body = serde_json::json!({ "error": self.error, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}
