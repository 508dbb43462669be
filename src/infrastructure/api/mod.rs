//! HTTP transport and the platform adapter built on it.
//!
//! `ApiClient` owns authentication, retry and pagination. `HttpPlatform`
//! maps each port operation onto a REST path (or the GraphQL endpoint for
//! metrics configuration).

pub mod client;
pub mod errors;
pub mod platform;
pub mod retry;

pub use client::{build_http_client, ApiClient, ApiClientConfig};
pub use errors::ApiError;
pub use platform::HttpPlatform;
pub use retry::{RetryBudget, RetryPolicy};
