//! Error types for reasoning calls and the stages built on them.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single call to a reasoning provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The call did not finish within its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection-level failure (DNS, TLS, reset, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The response envelope did not have the expected shape.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether retrying the same call may succeed.
    ///
    /// Timeouts, transport failures, rate limiting and server errors are
    /// transient; authentication and request errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) | Self::InvalidResponse(_) => true,
            Self::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
        }
    }
}

/// Failure surfaced by the critique or debate stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The model answered, but not in the required shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every attempt allowed by the retry policy failed.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Cause of the last failed attempt.
        last: Box<StageError>,
    },

    /// The stage was stopped from outside.
    #[error("stage cancelled")]
    Cancelled,
}

impl StageError {
    /// Create a malformed-response error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Whether the retry policy may try again after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Malformed(_) => true,
            Self::Provider(err) => err.is_retryable(),
            Self::RetriesExhausted { .. } | Self::Cancelled => false,
        }
    }
}
