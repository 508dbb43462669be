//! Infrastructure layer module
//!
//! Adapters to the outside world:
//! - HTTP transport and the REST/GraphQL platform adapter
//! - Access token acquisition and caching
//! - Configuration loading
//! - Logging
//!
//! `HttpPlatform` satisfies the port traits defined in the domain layer.

pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
