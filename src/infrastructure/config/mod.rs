//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - user and project YAML files
//! - `RESIM_*` environment variable overrides
//! - validation of ranges and credential pairs

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
