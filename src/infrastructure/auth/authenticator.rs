//! Token acquisition across cached, non-interactive and interactive flows.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::cache::{CachedToken, TokenCache};
use super::errors::AuthError;
use super::flows::{Grant, GrantClient};
use super::TokenProvider;
use crate::domain::models::AuthConfig;

/// Public client used by the interactive flows when none is configured.
pub const DEFAULT_CLI_CLIENT_ID: &str = "resim-cli";

/// Pick the grant for the configured credentials: client credentials, then
/// username and password, then the device code flow.
pub fn select_grant(auth: &AuthConfig) -> Grant {
    let cli_client_id = auth
        .cli_client_id
        .clone()
        .unwrap_or_else(|| DEFAULT_CLI_CLIENT_ID.to_string());
    match (&auth.client_id, &auth.client_secret, &auth.username, &auth.password) {
        (Some(client_id), Some(client_secret), _, _) => Grant::ClientCredentials {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        },
        (_, _, Some(username), Some(password)) => Grant::Password {
            client_id: cli_client_id,
            username: username.clone(),
            password: password.clone(),
        },
        _ => Grant::DeviceCode {
            client_id: cli_client_id,
        },
    }
}

/// Token provider backed by the on-disk cache and the configured grant.
pub struct Authenticator {
    grants: GrantClient,
    grant: Grant,
    cache: Option<Arc<TokenCache>>,
    current: Mutex<Option<CachedToken>>,
}

impl Authenticator {
    /// Without a cache, every process obtains its own token.
    pub fn new(grants: GrantClient, grant: Grant, cache: Option<TokenCache>) -> Self {
        Self {
            grants,
            grant,
            cache: cache.map(Arc::new),
            current: Mutex::new(None),
        }
    }

    async fn acquire(&self, force: bool) -> Result<String, AuthError> {
        let mut current = self.current.lock().await;
        if !force {
            if let Some(token) = current.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.token.clone());
            }
        }

        let Some(cache) = self.cache.clone() else {
            let token = self.grants.obtain(&self.grant).await?;
            let value = token.token.clone();
            *current = Some(token);
            return Ok(value);
        };

        let lock_cache = Arc::clone(&cache);
        let _lock = tokio::task::spawn_blocking(move || lock_cache.lock())
            .await
            .map_err(|e| AuthError::Cache {
                path: cache.path().to_path_buf(),
                source: std::io::Error::other(e),
            })??;

        // Another invocation may have refreshed while we waited for the lock.
        if let Some(cached) = cache.load().filter(CachedToken::is_fresh) {
            let stale = current.as_ref().is_some_and(|c| c.token == cached.token);
            if !(force && stale) {
                debug!("using cached access token");
                let value = cached.token.clone();
                *current = Some(cached);
                return Ok(value);
            }
        }

        if force {
            cache.clear();
        }
        let token = self.grants.obtain(&self.grant).await?;
        cache.store(&token)?;
        info!(expires_at = %token.expires_at, "obtained new access token");
        let value = token.token.clone();
        *current = Some(token);
        Ok(value)
    }
}

#[async_trait]
impl TokenProvider for Authenticator {
    async fn token(&self) -> Result<String, AuthError> {
        self.acquire(false).await
    }

    async fn refresh(&self) -> Result<String, AuthError> {
        self.acquire(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_credentials_take_priority() {
        let auth = AuthConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            username: Some("user".into()),
            password: Some("pw".into()),
            ..Default::default()
        };
        assert!(matches!(select_grant(&auth), Grant::ClientCredentials { .. }));
    }

    #[test]
    fn test_password_then_device_code() {
        let auth = AuthConfig {
            username: Some("user".into()),
            password: Some("pw".into()),
            ..Default::default()
        };
        assert!(matches!(select_grant(&auth), Grant::Password { .. }));

        let auth = AuthConfig {
            client_id: Some("id-without-secret".into()),
            ..Default::default()
        };
        match select_grant(&auth) {
            Grant::DeviceCode { client_id } => assert_eq!(client_id, DEFAULT_CLI_CLIENT_ID),
            other => panic!("unexpected grant {other:?}"),
        }
    }
}
