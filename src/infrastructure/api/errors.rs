use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::ports::PlatformError;
use crate::infrastructure::auth::AuthError;

/// Errors that can occur when interacting with the platform API
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request could not be built (bad URL, bad header)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Rejected by the server (HTTP 4xx other than those below)
    #[error("{body}")]
    Client { status: StatusCode, body: String },

    /// Resource not found (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Conflicts with an existing resource (HTTP 409)
    #[error("{0}")]
    Conflict(String),

    /// Missing or rejected credentials (HTTP 401)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("rate limit exceeded: {body}")]
    RateLimited {
        body: String,
        retry_after: Option<Duration>,
    },

    /// Server error (HTTP 5xx)
    #[error("server error ({status}): {body}")]
    Server { status: StatusCode, body: String },

    /// Network or connection error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request timeout
    #[error("request timed out")]
    Timeout,

    /// JSON serialization/deserialization error
    #[error("unexpected response body: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors reported inside a GraphQL response
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Token acquisition failed
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Classify a non-success response.
    pub fn from_status(status: StatusCode, body: String, retry_after: Option<Duration>) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound(body),
            StatusCode::CONFLICT => Self::Conflict(body),
            StatusCode::UNAUTHORIZED => Self::Unauthorized(body),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { body, retry_after },
            StatusCode::REQUEST_TIMEOUT => Self::Timeout,
            status if status.is_server_error() => Self::Server { status, body },
            status => Self::Client { status, body },
        }
    }

    /// Returns true if this error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Server { .. } | Self::Timeout => true,
            Self::Network(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            Self::Auth(err) => err.is_transient(),
            _ => false,
        }
    }

    /// Server-suggested delay before the next attempt, if any.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<ApiError> for PlatformError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(body) => Self::NotFound(body),
            ApiError::Conflict(body) => Self::Conflict(body),
            ApiError::Client { status, body } => Self::Rejected {
                status: status.as_u16(),
                body,
            },
            ApiError::Unauthorized(body) => Self::Unauthorized(body),
            ApiError::Auth(err) => Self::Unauthorized(err.to_string()),
            ApiError::RateLimited { body, .. } => Self::Server { status: 429, body },
            ApiError::Server { status, body } => Self::Server {
                status: status.as_u16(),
                body,
            },
            ApiError::Timeout => Self::Timeout,
            ApiError::Network(err) if err.is_timeout() => Self::Timeout,
            ApiError::Network(err) => Self::Network(err.to_string()),
            ApiError::Json(err) => Self::Decode(err.to_string()),
            ApiError::GraphQl(message) | ApiError::InvalidRequest(message) => Self::Rejected {
                status: 400,
                body: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, String::new(), None)
            .is_transient());
        assert!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new(), None)
            .is_transient());
        assert!(ApiError::Timeout.is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!ApiError::from_status(StatusCode::BAD_REQUEST, "bad".into(), None).is_transient());
        assert!(!ApiError::from_status(StatusCode::NOT_FOUND, String::new(), None).is_transient());
        assert!(!ApiError::from_status(StatusCode::CONFLICT, String::new(), None).is_transient());
        assert!(!ApiError::from_status(StatusCode::UNAUTHORIZED, String::new(), None).is_transient());
    }

    #[test]
    fn test_client_error_keeps_body_verbatim() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "build is archived".into(), None);
        let platform: PlatformError = err.into();
        assert_eq!(platform.to_string(), "build is archived");
    }
}
