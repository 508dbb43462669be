use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure for the ReSim client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Base URL of the platform API
    #[serde(default = "default_url")]
    pub url: String,

    /// Base URL of the OAuth authority
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// API audience requested for access tokens
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Active project (name or ID)
    #[serde(default)]
    pub project: Option<String>,

    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Status polling configuration
    #[serde(default)]
    pub poll: PollConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_url() -> String {
    "https://api.resim.ai/v1/".to_string()
}

fn default_auth_url() -> String {
    "https://resim.us.auth0.com/".to_string()
}

fn default_audience() -> String {
    "https://api.resim.ai".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            auth_url: default_auth_url(),
            audience: default_audience(),
            project: None,
            auth: AuthConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
            poll: PollConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Credential configuration. Flows are tried in the order: cached token,
/// client credentials, username and password, interactive device code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthConfig {
    /// Client ID for non-interactive client-credentials auth
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret for non-interactive client-credentials auth
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Username for password auth
    #[serde(default)]
    pub username: Option<String>,

    /// Password for password auth
    #[serde(default)]
    pub password: Option<String>,

    /// Public client ID used by the interactive flows
    #[serde(default)]
    pub cli_client_id: Option<String>,

    /// Where the access token is cached between invocations
    #[serde(default)]
    pub token_cache_path: Option<PathBuf>,
}

/// Status polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PollConfig {
    /// Seconds between status reads (minimum 1)
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,

    /// Stale terminal reads tolerated right after a rerun request
    #[serde(default = "default_restart_grace_polls")]
    pub restart_grace_polls: u32,

    /// Consecutive transient read failures tolerated while polling
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

const fn default_poll_interval_secs() -> u64 {
    10
}

const fn default_restart_grace_polls() -> u32 {
    3
}

const fn default_max_consecutive_errors() -> u32 {
    3
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            restart_grace_polls: default_restart_grace_polls(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

/// Retry configuration for transient transport failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts including the first (1-5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Upper bound on total time spent retrying one request, in seconds
    #[serde(default = "default_max_elapsed_secs")]
    pub max_elapsed_secs: u64,
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

const fn default_max_elapsed_secs() -> u64 {
    60
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_elapsed_secs: default_max_elapsed_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for a JSON log file
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
