//! CLI command implementations.

pub mod batches;
pub mod branches;
pub mod builds;
pub mod debug;
pub mod experience_tags;
pub mod experiences;
pub mod ingest;
pub mod logs;
pub mod metrics;
pub mod metrics_builds;
pub mod projects;
pub mod reports;
pub mod suites;
pub mod sweeps;
pub mod systems;
pub mod workflows;

use clap::Args;

/// `--project`, shared by every command scoped to a project.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArg {
    /// Project name or ID (defaults to RESIM_PROJECT)
    #[arg(long)]
    pub project: Option<String>,
}

impl ProjectArg {
    pub fn as_deref(&self) -> Option<&str> {
        self.project.as_deref()
    }
}
