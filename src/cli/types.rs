//! CLI type definitions
//!
//! The clap command tree. Nouns accept both singular and plural spellings.

use clap::{Args, Parser, Subcommand};

use super::commands::batches::{BatchArgs, BatchCommands};
use super::commands::branches::BranchArgs;
use super::commands::builds::BuildArgs;
use super::commands::debug::DebugArgs;
use super::commands::experience_tags::ExperienceTagArgs;
use super::commands::experiences::ExperienceArgs;
use super::commands::ingest::IngestArgs;
use super::commands::logs::LogArgs;
use super::commands::metrics::MetricsArgs;
use super::commands::metrics_builds::MetricsBuildArgs;
use super::commands::projects::ProjectArgs;
use super::commands::reports::{ReportArgs, ReportCommands};
use super::commands::suites::SuiteArgs;
use super::commands::sweeps::{SweepArgs, SweepCommands};
use super::commands::systems::SystemArgs;
use super::commands::workflows::{WorkflowArgs, WorkflowCommands, WorkflowRunCommands};
use super::output::OutputMode;
use crate::domain::models::Config;

#[derive(Parser, Debug)]
#[command(name = "resim")]
#[command(about = "Command-line client for the ReSim simulation platform", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Flags accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// API base URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Authentication server URL
    #[arg(long, global = true)]
    pub auth_url: Option<String>,

    /// Print created IDs as key=value lines for CI
    #[arg(long, global = true)]
    pub github: bool,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Flags take precedence over files and the environment.
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.url.clone_from(url);
        }
        if let Some(auth_url) = &self.auth_url {
            config.auth_url.clone_from(auth_url);
        }
    }

    pub const fn output_mode(&self) -> OutputMode {
        OutputMode {
            json: self.json,
            github: self.github,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage projects
    #[command(visible_alias = "project")]
    Projects(ProjectArgs),

    /// Manage branches
    #[command(visible_alias = "branch")]
    Branches(BranchArgs),

    /// Manage systems
    #[command(visible_alias = "system")]
    Systems(SystemArgs),

    /// Manage builds
    #[command(visible_alias = "build")]
    Builds(BuildArgs),

    /// Manage experiences
    #[command(visible_alias = "experience")]
    Experiences(ExperienceArgs),

    /// Manage experience tags
    #[command(visible_alias = "experience-tag")]
    ExperienceTags(ExperienceTagArgs),

    /// Manage metrics builds
    #[command(visible_alias = "metrics-build")]
    MetricsBuilds(MetricsBuildArgs),

    /// Submit and follow batches
    #[command(visible_alias = "batch")]
    Batches(BatchArgs),

    /// Submit and follow parameter sweeps
    #[command(visible_alias = "sweep")]
    Sweeps(SweepArgs),

    /// Manage and run test suites
    #[command(visible_aliases = ["suite", "test-suites", "test-suite"])]
    Suites(SuiteArgs),

    /// Generate reports
    #[command(visible_alias = "report")]
    Reports(ReportArgs),

    /// Manage and run workflows
    #[command(visible_alias = "workflow")]
    Workflows(WorkflowArgs),

    /// Run metrics over logs recorded outside the platform
    Ingest(IngestArgs),

    /// List and download job logs
    #[command(visible_alias = "log")]
    Logs(LogArgs),

    /// Start an interactive debug session for one experience
    Debug(DebugArgs),

    /// Metrics configuration
    Metrics(MetricsArgs),
}

impl Cli {
    /// Whether the command only reports a status through its exit code.
    /// Such commands print nothing, not even logs or errors.
    pub fn is_silent(&self) -> bool {
        match &self.command {
            Commands::Batches(args) => matches!(
                args.command,
                BatchCommands::Get {
                    exit_status: true,
                    ..
                }
            ),
            Commands::Sweeps(args) => matches!(
                args.command,
                SweepCommands::Get {
                    exit_status: true,
                    ..
                }
            ),
            Commands::Reports(args) => matches!(
                args.command,
                ReportCommands::Get {
                    exit_status: true,
                    ..
                }
            ),
            Commands::Workflows(args) => match &args.command {
                WorkflowCommands::Runs(runs) => matches!(
                    runs.command,
                    WorkflowRunCommands::Get {
                        exit_status: true,
                        ..
                    }
                ),
                _ => false,
            },
            _ => false,
        }
    }
}
