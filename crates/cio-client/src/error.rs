//! Error types for the Customer.io client

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Whether re-attempting the call is expected to help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient: rate limiting, server trouble or a network-level failure
    Retryable,
    /// Rejected by the service or never sent because of a precondition
    Fatal,
}

/// Error types for the Customer.io client
#[derive(Error, Debug)]
pub enum Error {
    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded (retry after {retry_after:?}): {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    /// Server error (500, 502, 503, 504)
    #[error("Server error: HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// Network-level failure: connect refused, DNS, timeout, connection
    /// dropped before or while the response is read
    #[error("Connection error: {0}")]
    Connection(#[source] reqwest::Error),

    /// Request rejected by the service (4xx other than 429)
    #[error("HTTP {status}: {message}")]
    Client { status: u16, message: String },

    /// Status outside every class the client knows how to handle
    #[error("Unexpected status: HTTP {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// Any other failure reported by the HTTP transport
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL could not be built from the base and path
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Input rejected before any request was sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The session was closed; it never reconnects
    #[error("Client session is closed")]
    SessionClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<cio_config::ConfigError> for Error {
    fn from(err: cio_config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl Error {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimited { .. } | Error::Server { .. } | Error::Connection(_)
        )
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_retryable() {
            ErrorKind::Retryable
        } else {
            ErrorKind::Fatal
        }
    }

    /// HTTP status of the response that caused the error, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            Error::Server { status, .. }
            | Error::Client { status, .. }
            | Error::UnexpectedStatus { status, .. } => Some(*status),
            Error::Http(e) | Error::Connection(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Create an error from a non-success HTTP status and the response text
    pub fn from_status(status: StatusCode, headers: &HeaderMap, message: String) -> Self {
        match status.as_u16() {
            429 => Error::RateLimited {
                retry_after: parse_retry_after(headers),
                message,
            },
            500 | 502 | 503 | 504 => Error::Server {
                status: status.as_u16(),
                message,
            },
            400..=499 => Error::Client {
                status: status.as_u16(),
                message,
            },
            _ => Error::UnexpectedStatus {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Classify a transport failure.
    ///
    /// Builder and redirect errors are fatal. Anything that failed on the
    /// wire, including a body cut short, is a retryable `Connection`.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() || err.is_redirect() {
            return Error::Http(err);
        }

        if err.is_connect()
            || err.is_timeout()
            || err.is_request()
            || err.is_body()
            || caused_by_io(&err)
        {
            Error::Connection(err)
        } else {
            Error::Http(err)
        }
    }
}

/// An I/O error anywhere in the source chain, e.g. an incomplete body
fn caused_by_io(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if cause.is::<std::io::Error>() {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Retry-After in delay-seconds form
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn classify(status: u16) -> Error {
        Error::from_status(
            StatusCode::from_u16(status).unwrap(),
            &HeaderMap::new(),
            "body".to_string(),
        )
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            let err = classify(status);
            assert_eq!(err.kind(), ErrorKind::Retryable, "status {}", status);
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn test_client_errors_are_fatal() {
        for status in (400..500).filter(|s| *s != 429) {
            let err = classify(status);
            assert!(matches!(err, Error::Client { .. }), "status {}", status);
            assert_eq!(err.kind(), ErrorKind::Fatal);
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn test_other_statuses_are_unexpected() {
        for status in [301, 501, 505] {
            let err = classify(status);
            assert!(matches!(err, Error::UnexpectedStatus { .. }));
            assert_eq!(err.kind(), ErrorKind::Fatal);
        }
    }

    #[test]
    fn test_retry_after_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));

        let err = Error::from_status(StatusCode::TOO_MANY_REQUESTS, &headers, String::new());
        match err {
            Error::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(12)))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_message_carries_response_text() {
        let err = classify(422);
        assert_eq!(err.to_string(), "HTTP 422: body");
    }

    #[test]
    fn test_precondition_errors_are_fatal() {
        assert_eq!(Error::SessionClosed.kind(), ErrorKind::Fatal);
        assert_eq!(
            Error::InvalidArgument("x".into()).kind(),
            ErrorKind::Fatal
        );
        assert_eq!(Error::SessionClosed.status(), None);
    }
}
