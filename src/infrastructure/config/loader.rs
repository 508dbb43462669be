use std::path::PathBuf;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;
use url::Url;

use crate::domain::models::config::Config;

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "RESIM_";

/// Credential settings that are also accepted without the `AUTH__` prefix,
/// e.g. `RESIM_CLIENT_ID`.
const FLAT_AUTH_KEYS: [&str; 5] = [
    "client_id",
    "client_secret",
    "username",
    "password",
    "token_cache_path",
];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid {field} URL {value}: {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid max_attempts: {0}. Must be between 1 and 5")]
    InvalidMaxAttempts(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid max_elapsed_secs: {0}. Must be between 1 and 60")]
    InvalidMaxElapsed(u64),

    #[error("Invalid request_timeout_secs: {0}. Must be at least 1")]
    InvalidRequestTimeout(u64),

    #[error("Client ID and client secret must be set together")]
    IncompleteClientCredentials,

    #[error("Username and password must be set together")]
    IncompletePasswordCredentials,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `<config dir>/resim/config.yaml` (user config)
    /// 3. `.resim/config.yaml` (project config)
    /// 4. Environment variables (`RESIM_*`, nested keys split on `__`)
    ///
    /// Command-line flags are applied on top by the CLI.
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// The provider chain used by [`ConfigLoader::load`].
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(user) = Self::user_config_path() {
            figment = figment.merge(Yaml::file(user));
        }
        figment
            .merge(Yaml::file(".resim/config.yaml"))
            .merge(Self::env())
    }

    /// Load configuration from a specific file, still honouring the environment
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Self::env())
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("resim").join("config.yaml"))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).map(|key| {
            let key = key.as_str().to_ascii_lowercase();
            if FLAT_AUTH_KEYS.contains(&key.as_str()) {
                format!("auth.{key}").into()
            } else {
                key.replace("__", ".").into()
            }
        })
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for (field, value) in [("api", &config.url), ("auth", &config.auth_url)] {
            Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
                field,
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }

        if config.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout(
                config.request_timeout_secs,
            ));
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        // Validate retry config
        if !(1..=5).contains(&config.retry.max_attempts) {
            return Err(ConfigError::InvalidMaxAttempts(config.retry.max_attempts));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if !(1..=60).contains(&config.retry.max_elapsed_secs) {
            return Err(ConfigError::InvalidMaxElapsed(config.retry.max_elapsed_secs));
        }

        let auth = &config.auth;
        if auth.client_id.is_some() != auth.client_secret.is_some() {
            return Err(ConfigError::IncompleteClientCredentials);
        }
        if auth.username.is_some() != auth.password.is_some() {
            return Err(ConfigError::IncompletePasswordCredentials);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
url: https://api.example.test/v1/
project: autonomy
poll:
  interval_secs: 2
retry:
  max_attempts: 3
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.url, "https://api.example.test/v1/");
        assert_eq!(config.project.as_deref(), Some("autonomy"));
        assert_eq!(config.poll.interval_secs, 2);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.max_backoff_ms, 10_000);
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_max_attempts_bounds() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxAttempts(0)
        ));

        config.retry.max_attempts = 6;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxAttempts(6)
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30000;
        config.retry.max_backoff_ms = 10000;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidBackoff(30000, 10000)
        ));
    }

    #[test]
    fn test_validate_elapsed_budget() {
        let mut config = Config::default();
        config.retry.max_elapsed_secs = 120;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxElapsed(120)
        ));
    }

    #[test]
    fn test_validate_bad_url() {
        let config = Config {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidUrl { field: "api", .. }
        ));
    }

    #[test]
    fn test_validate_half_client_credentials() {
        let mut config = Config::default();
        config.auth.client_id = Some("id".to_string());
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::IncompleteClientCredentials
        ));
    }

    #[test]
    fn test_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "project: from-file\nlogging:\n  level: info").unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("RESIM_PROJECT", Some("from-env")),
                ("RESIM_LOGGING__FORMAT", Some("json")),
                ("RESIM_CLIENT_ID", Some("ci-client")),
                ("RESIM_CLIENT_SECRET", Some("ci-secret")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.project.as_deref(), Some("from-env"));
                assert_eq!(config.logging.level, "info");
                assert_eq!(config.logging.format, "json");
                assert_eq!(config.auth.client_id.as_deref(), Some("ci-client"));
                assert_eq!(config.auth.client_secret.as_deref(), Some("ci-secret"));
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "request_timeout_secs: 5\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "request_timeout_secs: 15\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.request_timeout_secs, 15, "Override should win");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
