//! Fetch error types
//!
//! The only failure the results page models is a failed fetch. Messages are
//! kept as strings so errors can be cloned into the published display state.

use thiserror::Error;

/// A failed text or image search request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, broken body stream
    #[error("network error: {0}")]
    Network(String),

    /// The configured request timeout elapsed
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The backend answered with a non-success status
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The response body was not a `{ total, docs }` payload
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
