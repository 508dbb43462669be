//! ReSim - command-line client for the ReSim simulation-testing platform
//!
//! `resim` creates and exercises simulation workloads (projects, builds,
//! experiences, batches, sweeps, test suites, reports, workflows and log
//! ingestions) and follows long-running work to a CI-friendly exit code.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the platform port traits
//! - **Service Layer** (`services`): resolution, submission, observation,
//!   supervision, ingestion, log download and metrics sync
//! - **Infrastructure Layer** (`infrastructure`): HTTP transport, auth,
//!   configuration and logging
//! - **Adapters** (`adapters`): an in-memory platform for tests and dry runs
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use resim::services::observer::{BatchItem, ObserveOptions, Observer, ObserverConfig};
//!
//! let observer = Observer::new(platform, ObserverConfig::default());
//! let outcome = observer
//!     .observe(&BatchItem { project, id: batch }, &ObserveOptions::default())
//!     .await?;
//! println!("batch finished with {}", outcome.status);
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult, ValidationError};
pub use domain::models::{Config, EntityKind, JobStatus, WorkStatus};
pub use domain::ports::{Platform, PlatformError, PlatformResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
