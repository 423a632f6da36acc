//! Error types for the hub.
//!
//! [`HubError`] is the HTTP-facing error: each variant maps to a status
//! code and a structured JSON error body. [`TransportError`] describes a
//! failed write or close on a single subscriber connection; it is never
//! surfaced to an HTTP caller, only logged and resolved by eviction.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid message"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status     |
/// |-----------|------------|-----------------|
/// | 1000–1999 | Validation | 400 Bad Request |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Request body could not be decoded as an envelope.
    #[error("{0}")]
    MalformedBody(String),

    /// Envelope decoded but carried an action other than `publish`.
    #[error("invalid message")]
    InvalidAction,
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedBody(_) => 1001,
            Self::InvalidAction => 1002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_) | Self::InvalidAction => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedBody(err.to_string())
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure writing to or closing a single subscriber transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer is gone or the connection was already closed locally.
    #[error("connection is closing: {0}")]
    Closing(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Unexpected(String),

    /// The outgoing payload could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TransportError {
    /// Classifies a WebSocket sink error.
    ///
    /// Broken pipes, resets and aborted connections anywhere in the source
    /// chain count as the peer closing; everything else is unexpected.
    #[must_use]
    pub fn classify(err: &axum::Error) -> Self {
        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
        while let Some(current) = source {
            if let Some(io) = current.downcast_ref::<std::io::Error>()
                && matches!(
                    io.kind(),
                    std::io::ErrorKind::BrokenPipe
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::NotConnected
                )
            {
                return Self::Closing(err.to_string());
            }
            source = current.source();
        }
        Self::Unexpected(err.to_string())
    }

    /// Returns `true` if this error is the expected closing-connection signal.
    #[must_use]
    pub const fn is_closing(&self) -> bool {
        matches!(self, Self::Closing(_))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_request() {
        assert_eq!(
            HubError::InvalidAction.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HubError::MalformedBody("eof".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(HubError::InvalidAction.to_string(), "invalid message");
    }

    #[tokio::test]
    async fn error_response_carries_code_and_message() {
        let response = HubError::InvalidAction.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body should be readable");
        };
        let Ok(json) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
            panic!("body should be JSON");
        };
        assert_eq!(
            json,
            serde_json::json!({ "error": { "code": 1002, "message": "invalid message" } })
        );
    }

    #[test]
    fn broken_pipe_is_closing() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err = axum::Error::new(io);
        assert!(TransportError::classify(&err).is_closing());
    }

    #[test]
    fn other_errors_are_unexpected() {
        let io = std::io::Error::other("boom");
        let err = axum::Error::new(io);
        assert!(!TransportError::classify(&err).is_closing());
    }
}
