//! On-disk access token cache shared by concurrent invocations.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::errors::AuthError;

/// Tokens closer than this to expiry are treated as expired.
pub const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Access token with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Token expiring `expires_in_secs` from now.
    pub fn new(token: String, expires_in_secs: i64) -> Self {
        Self {
            token,
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    /// Usable for at least the leeway window from `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now >= Duration::seconds(EXPIRY_LEEWAY_SECS)
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

/// Exclusive advisory lock on the cache, held while a token is refreshed so
/// concurrent invocations do not race each other through the flow.
pub struct CacheLock {
    _lock: Flock<File>,
}

/// JSON file holding the last access token, readable only by its owner.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/resim/token.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("resim").join("token.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cache_error(&self) -> impl FnOnce(std::io::Error) -> AuthError + '_ {
        move |source| AuthError::Cache {
            path: self.path.clone(),
            source,
        }
    }

    /// Read the cached token. A missing or unreadable cache is treated as empty.
    pub fn load(&self) -> Option<CachedToken> {
        let text = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&text) {
            Ok(token) => Some(token),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring corrupt token cache");
                None
            }
        }
    }

    /// Write the token, creating the file owner-only.
    pub fn store(&self, token: &CachedToken) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(self.cache_error())?;
        }
        let body = serde_json::to_vec(token)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(self.cache_error())?;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(self.cache_error())?;
        file.write_all(&body).map_err(self.cache_error())?;
        debug!(path = %self.path.display(), expires_at = %token.expires_at, "stored access token");
        Ok(())
    }

    /// Remove the cache file. A missing file is not an error.
    pub fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "failed to clear token cache");
            }
        }
    }

    /// Block until the exclusive lock is held. The lock file sits next to
    /// the cache so the cache itself can be rewritten while locked.
    pub fn lock(&self) -> Result<CacheLock, AuthError> {
        let lock_path = self.path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(self.cache_error())?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o600)
            .open(&lock_path)
            .map_err(self.cache_error())?;
        let lock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            AuthError::Cache {
                path: lock_path.clone(),
                source: std::io::Error::from(errno),
            }
        })?;
        Ok(CacheLock { _lock: lock })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_load() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("nested").join("token.json"));
        assert!(cache.load().is_none());

        let token = CachedToken::new("abc".into(), 3600);
        cache.store(&token).unwrap();
        assert_eq!(cache.load(), Some(token));

        let mode = fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        fs::write(cache.path(), "not json").unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_freshness_leeway() {
        let now = Utc::now();
        let token = CachedToken {
            token: "t".into(),
            expires_at: now + Duration::seconds(30),
        };
        assert!(!token.is_fresh_at(now));
        let token = CachedToken {
            token: "t".into(),
            expires_at: now + Duration::seconds(120),
        };
        assert!(token.is_fresh_at(now));
    }

    #[test]
    fn test_lock_can_be_reacquired_after_drop() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        let lock = cache.lock().unwrap();
        drop(lock);
        assert!(cache.lock().is_ok());
    }
}
