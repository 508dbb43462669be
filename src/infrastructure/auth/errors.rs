use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while obtaining an access token
#[derive(Error, Debug)]
pub enum AuthError {
    /// The authority rejected the credentials
    #[error("authentication rejected: {0}")]
    Rejected(String),

    /// The user declined the device authorization request
    #[error("device authorization was denied")]
    AccessDenied,

    /// The device code expired before the user approved it
    #[error("device code expired before authorization completed; run the command again")]
    DeviceCodeExpired,

    /// Server error from the authority
    #[error("authority error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Network or connection error
    #[error("network error contacting the authority: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("unexpected authority response: {0}")]
    Json(#[from] serde_json::Error),

    /// Token cache could not be read or written
    #[error("token cache error on {}: {source}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The authority URL is not usable
    #[error("invalid auth URL: {0}")]
    InvalidUrl(String),
}

impl AuthError {
    /// Returns true if this error is transient and the flow could be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Server { .. } => true,
            Self::Network(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }
}
