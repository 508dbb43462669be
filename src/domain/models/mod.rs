pub mod batch;
pub mod build;
pub mod config;
pub mod entity;
pub mod experience;
pub mod parameters;
pub mod project;
pub mod requests;
pub mod status;
pub mod suite;
pub mod system;
pub mod workflow;

pub use batch::{Batch, DebugSession, Job, JobLog, Sweep};
pub use build::{Build, MetricsBuild};
pub use config::{AuthConfig, Config, LoggingConfig, PollConfig, RetryConfig};
pub use entity::EntityKind;
pub use experience::{
    EnvironmentVariable, Experience, ExperienceTag, DEFAULT_EXPERIENCE_TIMEOUT_SECS,
};
pub use parameters::{GridSearch, ParameterMap, ParameterSeparator, SweepParameter};
pub use project::{Branch, BranchType, Project};
pub use status::{JobStatus, WorkStatus};
pub use suite::{Report, TestSuite};
pub use system::{Architecture, ResourceRequirements, System};
pub use workflow::{Workflow, WorkflowRun, WorkflowRunSuite, WorkflowSuite};
