//! Error type for the stack service client.
//!
//! # Design
//! Every failure of every operation surfaces as one `ApiError` carrying
//! `(status, message, details)`. Non-2xx responses take the fields from the
//! service's JSON failure body. Failures that never produced a response
//! (connection refused, timeout) carry the placeholder triple, exposed as
//! named constants so callers can match on them.

use std::fmt;

use thiserror::Error;

use crate::http::HttpResponse;
use crate::wire::FailureBody;

/// Status sentinel used when no HTTP response was received.
pub const STATUS_PLACEHOLDER: &str = "status";
/// Message sentinel used when the failure carried no message.
pub const MESSAGE_PLACEHOLDER: &str = "message";
/// Details sentinel used when the failure carried no details.
pub const DETAILS_PLACEHOLDER: &str = "details";

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Where an `ApiError`'s status came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    /// The service answered with this HTTP status.
    Http(u16),
    /// No response was received. Displays as `STATUS_PLACEHOLDER`.
    Unknown,
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorStatus::Http(code) => write!(f, "{code}"),
            ErrorStatus::Unknown => f.write_str(STATUS_PLACEHOLDER),
        }
    }
}

/// The single error kind returned by `StackClient` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message} ({details})")]
pub struct ApiError {
    pub status: ErrorStatus,
    pub message: String,
    pub details: String,
}

impl ApiError {
    /// The placeholder triple used when no structured response is available.
    pub fn placeholder() -> Self {
        Self {
            status: ErrorStatus::Unknown,
            message: MESSAGE_PLACEHOLDER.to_string(),
            details: DETAILS_PLACEHOLDER.to_string(),
        }
    }

    /// Build an error from a received non-2xx response.
    ///
    /// `message` and `details` fall back to their placeholders independently
    /// when absent from the body or when the body is not JSON.
    pub fn from_response(response: &HttpResponse) -> Self {
        let body: FailureBody = serde_json::from_str(&response.body).unwrap_or_default();
        Self {
            status: ErrorStatus::Http(response.status),
            message: body.message.unwrap_or_else(|| MESSAGE_PLACEHOLDER.to_string()),
            details: body.details.unwrap_or_else(|| DETAILS_PLACEHOLDER.to_string()),
        }
    }

    /// A successful response whose body did not match the expected shape.
    pub(crate) fn decode(response: &HttpResponse, err: serde_json::Error) -> Self {
        Self {
            status: ErrorStatus::Http(response.status),
            message: "invalid response body".to_string(),
            details: err.to_string(),
        }
    }

    /// A request body that could not be serialized.
    pub(crate) fn encode(err: serde_json::Error) -> Self {
        Self {
            status: ErrorStatus::Unknown,
            message: "invalid request body".to_string(),
            details: err.to_string(),
        }
    }

    /// True when this error carries the full placeholder triple.
    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn structured_body_fills_every_field() {
        let err = ApiError::from_response(&response(409, r#"{"message":"bad","details":"oops"}"#));
        assert_eq!(err.status, ErrorStatus::Http(409));
        assert_eq!(err.message, "bad");
        assert_eq!(err.details, "oops");
        assert!(!err.is_placeholder());
    }

    #[test]
    fn missing_fields_fall_back_independently() {
        let err = ApiError::from_response(&response(404, r#"{"message":"Not found"}"#));
        assert_eq!(err.status, ErrorStatus::Http(404));
        assert_eq!(err.message, "Not found");
        assert_eq!(err.details, DETAILS_PLACEHOLDER);
    }

    #[test]
    fn non_json_body_keeps_status_only() {
        let err = ApiError::from_response(&response(502, "<html>Bad Gateway</html>"));
        assert_eq!(err.status, ErrorStatus::Http(502));
        assert_eq!(err.message, MESSAGE_PLACEHOLDER);
        assert_eq!(err.details, DETAILS_PLACEHOLDER);
    }

    #[test]
    fn placeholder_displays_sentinels() {
        let err = ApiError::placeholder();
        assert!(err.is_placeholder());
        assert_eq!(err.to_string(), "status: message (details)");
    }

    #[test]
    fn http_status_displays_code() {
        let err = ApiError::from_response(&response(401, r#"{"message":"Unauthorized","details":"no token"}"#));
        assert_eq!(err.to_string(), "401: Unauthorized (no token)");
    }
}
