//! In-process platform used by tests and offline development.
//!
//! Records live in memory behind a single lock. Long-running items advance
//! through scripted status steps, one step per status read, so polling code
//! can be exercised without a server.

mod platform;

pub use platform::InMemoryPlatform;
