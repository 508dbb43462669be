use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::models::config::LoggingConfig;

/// Logging configuration after command-line adjustments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for stderr (json, pretty)
    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Directory for a JSON log file (optional, if None logs only to stderr)
    pub log_dir: Option<PathBuf>,

    /// Suppress all log output
    #[serde(default)]
    pub silent: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            log_dir: None,
            silent: false,
        }
    }
}

impl LogConfig {
    /// Raise the level to `debug` unless it is already more verbose.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose && self.level != "trace" {
            self.level = "debug".to_string();
        }
        self
    }

    #[must_use]
    pub const fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            format: if config.format.eq_ignore_ascii_case("json") {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            log_dir: config.log_dir.clone(),
            silent: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

const fn default_format() -> LogFormat {
    LogFormat::Pretty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_logging_config() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
            log_dir: None,
        };
        let log = LogConfig::from(&config);
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.level, "info");
    }

    #[test]
    fn test_verbose_raises_level() {
        let log = LogConfig::default().verbose(true);
        assert_eq!(log.level, "debug");
        let log = LogConfig {
            level: "trace".to_string(),
            ..Default::default()
        }
        .verbose(true);
        assert_eq!(log.level, "trace");
    }
}
