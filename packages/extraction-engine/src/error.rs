//! Typed errors for the extraction engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Retryability is carried as
//! data so the retry controller branches on classification alone instead of
//! matching concrete error sources.

use thiserror::Error;

use crate::metrics::PerformanceSample;

/// Errors that can occur during an extraction.
///
/// The set is closed: every failure a provider call can produce maps onto
/// one of these kinds, and [`ExtractionError::is_retryable`] is the single
/// source of truth for whether repeating the call may help.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// Network/transport failure before a response was obtained
    #[error("connection error: {message}")]
    Connection { message: String },

    /// Non-2xx status from the provider
    #[error("provider returned HTTP {status}: {message}")]
    Response { status: u16, message: String },

    /// Provider response body is not interpretable as structured content
    #[error("unparseable provider response: {message}")]
    Parsing { message: String },

    /// Parsed content failed a schema constraint that could not be repaired
    #[error("field `{field}` failed validation: {message}")]
    Validation { field: String, message: String },

    /// Unknown provider or model name, or unusable provider configuration
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Operation was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,
}

impl ExtractionError {
    /// Whether repeating the failed operation may succeed.
    ///
    /// Connection failures and transient provider statuses (429, 5xx) are
    /// retryable; everything else propagates on first occurrence.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Response { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    /// Originating HTTP status, when the provider produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub(crate) fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing {
            message: message.into(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Pipeline stage at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Content cleaning and token-budget bounding
    Preprocessing,
    /// Provider resolution, payload construction and the provider call
    Requesting,
    /// Interpreting the raw provider response
    Parsing,
    /// Schema validation of the parsed payload
    Validating,
}

/// Failure report returned at the `extract` boundary.
///
/// Carries the [`PerformanceSample`] gathered up to the point of failure so
/// callers keep observability (attempts, backoff, timings) even when
/// extraction fails.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ExtractionFailure {
    /// The classified error
    pub error: ExtractionError,

    /// Pipeline stage that produced it
    pub stage: Stage,

    /// Everything measured before the failure
    pub sample: PerformanceSample,
}

impl ExtractionFailure {
    /// Whether the surrounding system should requeue rather than reconfigure.
    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }
}

/// Result type alias for engine-internal operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for the `extract` boundary.
pub type ExtractResult<T> = std::result::Result<T, ExtractionFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ExtractionError::connection("reset").is_retryable());
        assert!(ExtractionError::Response {
            status: 429,
            message: "slow down".into()
        }
        .is_retryable());
        assert!(ExtractionError::Response {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());

        assert!(!ExtractionError::Response {
            status: 404,
            message: "missing".into()
        }
        .is_retryable());
        assert!(!ExtractionError::parsing("not json").is_retryable());
        assert!(!ExtractionError::validation("price", "not a number").is_retryable());
        assert!(!ExtractionError::configuration("unknown provider").is_retryable());
        assert!(!ExtractionError::Cancelled.is_retryable());
    }

    #[test]
    fn test_status_only_on_response_errors() {
        let err = ExtractionError::Response {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(ExtractionError::connection("x").status(), None);
    }

    #[test]
    fn test_validation_error_names_field() {
        let err = ExtractionError::validation("symbol", "required field missing");
        assert!(err.to_string().contains("symbol"));
    }
}
