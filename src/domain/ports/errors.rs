//! Failures reported by a platform adapter.

use thiserror::Error;

/// Outcome classes of a platform call after transport retries are spent.
/// Server-provided message text is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{body}")]
    Rejected { status: u16, body: String },

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl PlatformError {
    /// Whether the same call could succeed if tried again later.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Network(_) | Self::Timeout)
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;
