use reqwest::StatusCode;
use thiserror::Error;

use crate::provider::ProviderId;

/// Client input that failed validation. Always answered with 400.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Message is required and must be a non-empty string")]
    MissingMessage,

    #[error("Both latitude (lat) and longitude (lon) are required")]
    MissingCoordinates,

    #[error("Latitude must be a number between -90 and 90, got {0}")]
    InvalidLatitude(f64),

    #[error("Longitude must be a number between -180 and 180, got {0}")]
    InvalidLongitude(f64),

    #[error("Commodity name is required and must be a string")]
    MissingCommodity,

    #[error("Please upload an image file for pest detection")]
    MissingImage,

    #[error("Only image files are allowed, got '{0}'")]
    NotAnImage(String),

    #[error("Image is {size} bytes, the limit is {limit} bytes")]
    ImageTooLarge { size: usize, limit: usize },

    #[error("Type and message are required for feedback submission")]
    MissingFeedbackFields,

    #[error("Invalid feedback type '{0}'. Must be one of: bug, feature, general, complaint, suggestion")]
    InvalidFeedbackType(String),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(f64),
}

impl ValidationError {
    /// Short label used as the `error` field of a response body.
    pub fn title(&self) -> &'static str {
        match self {
            ValidationError::MissingMessage => "Invalid message",
            ValidationError::MissingCoordinates => "Missing coordinates",
            ValidationError::InvalidLatitude(_) => "Invalid latitude",
            ValidationError::InvalidLongitude(_) => "Invalid longitude",
            ValidationError::MissingCommodity => "Commodity required",
            ValidationError::MissingImage => "Image file required",
            ValidationError::NotAnImage(_) => "Invalid file type",
            ValidationError::ImageTooLarge { .. } => "File too large",
            ValidationError::MissingFeedbackFields
            | ValidationError::InvalidFeedbackType(_)
            | ValidationError::InvalidRating(_) => "Invalid feedback",
        }
    }
}

/// Failure talking to one of the third-party services.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("No API key configured for provider '{0}'")]
    NotConfigured(ProviderId),

    #[error("{provider} request failed with status {status}: {body}")]
    Status {
        provider: ProviderId,
        status: StatusCode,
        body: String,
    },

    #[error("{0} did not respond in time")]
    Timeout(ProviderId),

    #[error("Unable to connect to {provider}: {message}")]
    Unreachable { provider: ProviderId, message: String },

    #[error("Unexpected response from {provider}: {message}")]
    Decode { provider: ProviderId, message: String },
}

impl UpstreamError {
    /// Classify a transport-level reqwest failure.
    pub fn from_reqwest(provider: ProviderId, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(provider)
        } else if err.is_decode() {
            UpstreamError::Decode {
                provider,
                message: err.to_string(),
            }
        } else {
            UpstreamError::Unreachable {
                provider,
                message: err.to_string(),
            }
        }
    }

    pub fn decode(provider: ProviderId, message: impl Into<String>) -> Self {
        UpstreamError::Decode {
            provider,
            message: message.into(),
        }
    }

    /// HTTP status reported by the upstream, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Upstream response body, empty when there was none.
    pub fn body(&self) -> &str {
        match self {
            UpstreamError::Status { body, .. } => body,
            _ => "",
        }
    }
}

/// Shortens an upstream body for error messages and logs.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
