//! Access token acquisition.
//!
//! Tokens are cached on disk and shared between invocations. A provider
//! hands out the current token and can be asked to refresh it once the
//! platform rejects it.

pub mod authenticator;
pub mod cache;
pub mod errors;
pub mod flows;

use async_trait::async_trait;

pub use authenticator::{select_grant, Authenticator};
pub use cache::{CachedToken, TokenCache};
pub use errors::AuthError;
pub use flows::{Grant, GrantClient};

/// Source of bearer tokens for API requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A token believed to be valid, from memory, cache, or a new grant.
    async fn token(&self) -> Result<String, AuthError>;

    /// Discard the current token and obtain a new one.
    async fn refresh(&self) -> Result<String, AuthError>;
}
