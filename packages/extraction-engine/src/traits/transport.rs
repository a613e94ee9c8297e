//! Injected HTTP transport capability.
//!
//! The engine never performs raw socket I/O itself: every provider call
//! goes through this trait so tests can substitute a scripted fake and
//! callers can bring their own client stack.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::error::ExtractionError;

/// Transport-level failure: no usable response was obtained.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection could not be established or was interrupted
    #[error("connection failed: {0}")]
    Connect(String),

    /// No response within the transport's own time limit
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<TransportError> for ExtractionError {
    fn from(error: TransportError) -> Self {
        ExtractionError::Connection {
            message: error.to_string(),
        }
    }
}

/// Raw response from a provider endpoint.
///
/// Any status is a response; non-2xx classification (retry 429/5xx, fail
/// other 4xx) happens in the strategy, above the transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to deliver one JSON request to a provider endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` with the given headers.
    async fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        let ok = TransportResponse {
            status: 201,
            body: String::new(),
        };
        let not_ok = TransportResponse {
            status: 404,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!not_ok.is_success());
    }

    #[test]
    fn test_transport_errors_classify_as_retryable_connection() {
        let timeout: ExtractionError =
            TransportError::Timeout(Duration::from_secs(30)).into();
        let connect: ExtractionError = TransportError::Connect("refused".into()).into();

        assert!(matches!(timeout, ExtractionError::Connection { .. }));
        assert!(timeout.is_retryable());
        assert!(connect.is_retryable());
    }
}
