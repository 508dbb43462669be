//! Metrics build CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{list_table, render_list, timestamp};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, truncate, CommandOutput, Created, MessageOutput};
use crate::domain::models::{EntityKind, MetricsBuild};
use crate::services::catalog::{self, Membership};
use crate::services::validation::split_list;

#[derive(Args, Debug)]
pub struct MetricsBuildArgs {
    #[command(subcommand)]
    pub command: MetricsBuildCommands,
}

#[derive(Subcommand, Debug)]
pub enum MetricsBuildCommands {
    /// Create a new metrics build
    Create {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        name: String,
        /// Tagged container image URI
        #[arg(long)]
        image: String,
        #[arg(long)]
        version: String,
        /// Systems this metrics build applies to (names or IDs)
        #[arg(long, value_delimiter = ',')]
        systems: Vec<String>,
    },
    /// List metrics builds
    List {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// Register a metrics build with a system
    AddSystem {
        #[command(flatten)]
        project: ProjectArg,
        /// Metrics build name or ID
        #[arg(long = "metrics-build")]
        metrics_build: String,
        /// System name or ID
        #[arg(long)]
        system: String,
    },
    /// Remove a metrics build from a system
    RemoveSystem {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long = "metrics-build")]
        metrics_build: String,
        #[arg(long)]
        system: String,
    },
}

#[derive(Debug, Serialize)]
pub struct MetricsBuildListOutput {
    pub metrics_builds: Vec<MetricsBuild>,
}

impl CommandOutput for MetricsBuildListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "version", "image", "created"]);
        for build in &self.metrics_builds {
            table.add_row(vec![
                Cell::new(build.id),
                Cell::new(&build.name),
                Cell::new(&build.version),
                Cell::new(truncate(&build.image_uri, 48)),
                Cell::new(timestamp(build.creation_timestamp.as_ref())),
            ]);
        }
        render_list("metrics build", "metrics builds", &table, self.metrics_builds.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.metrics_builds).unwrap_or_default()
    }
}

pub async fn execute(args: MetricsBuildArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    match args.command {
        MetricsBuildCommands::Create {
            project,
            name,
            image,
            version,
            systems,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let build = catalog::create_metrics_build(
                platform,
                project,
                &name,
                &image,
                &version,
                &split_list(&systems),
            )
            .await?;
            Created::named(EntityKind::MetricsBuild, &build.name, build.id).print(ctx.output());
        }
        MetricsBuildCommands::List { project } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let metrics_builds = platform
                .list_metrics_builds(project, None)
                .await
                .context("failed to list metrics builds")?;
            output(&MetricsBuildListOutput { metrics_builds }, ctx.output().json);
        }
        MetricsBuildCommands::AddSystem {
            project,
            metrics_build,
            system,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            catalog::change_metrics_build_system(
                platform,
                project,
                &metrics_build,
                &system,
                Membership::Add,
            )
            .await?;
            if !ctx.output().github {
                output(
                    &MessageOutput::new(format!(
                        "Registered metrics build {metrics_build} with system {system}"
                    )),
                    ctx.output().json,
                );
            }
        }
        MetricsBuildCommands::RemoveSystem {
            project,
            metrics_build,
            system,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            catalog::change_metrics_build_system(
                platform,
                project,
                &metrics_build,
                &system,
                Membership::Remove,
            )
            .await?;
            if !ctx.output().github {
                output(
                    &MessageOutput::new(format!(
                        "Removed metrics build {metrics_build} from system {system}"
                    )),
                    ctx.output().json,
                );
            }
        }
    }
    Ok(CiExit::Success)
}
