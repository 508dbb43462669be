//! Port trait definitions (Hexagonal Architecture)
//!
//! The platform is split into one async trait per resource family:
//! - ProjectsApi: projects, branches, systems
//! - BuildsApi: builds and metrics builds
//! - ExperiencesApi: experiences and tags
//! - BatchesApi: batches, jobs, logs, sweeps, debug sessions
//! - SuitesApi: test suites and reports
//! - WorkflowsApi: workflows and workflow runs
//! - MetricsConfigApi: metrics configuration sync
//!
//! `Platform` bundles them so services can take a single `&dyn Platform`.
//! The HTTP adapter and the in-memory adapter both implement every port.

pub mod batches;
pub mod builds;
pub mod errors;
pub mod experiences;
pub mod metrics_config;
pub mod projects;
pub mod suites;
pub mod workflows;

pub use batches::BatchesApi;
pub use builds::BuildsApi;
pub use errors::{PlatformError, PlatformResult};
pub use experiences::ExperiencesApi;
pub use metrics_config::MetricsConfigApi;
pub use projects::ProjectsApi;
pub use suites::SuitesApi;
pub use workflows::WorkflowsApi;

/// Every platform capability behind one object.
pub trait Platform:
    ProjectsApi
    + BuildsApi
    + ExperiencesApi
    + BatchesApi
    + SuitesApi
    + WorkflowsApi
    + MetricsConfigApi
{
}

impl<T> Platform for T where
    T: ProjectsApi
        + BuildsApi
        + ExperiencesApi
        + BatchesApi
        + SuitesApi
        + WorkflowsApi
        + MetricsConfigApi
{
}
