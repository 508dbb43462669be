//! Domain layer for the ReSim client
//!
//! Records, statuses and errors, plus the port traits every platform
//! adapter implements.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, ValidationError};
