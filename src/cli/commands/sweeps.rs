//! Parameter sweep CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::batches::ExperienceFlags;
use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{colorize_status, list_table, render_list, timestamp};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, print_record, truncate, ActionOutput, CommandOutput, Created};
use crate::domain::models::{EntityKind, Sweep};
use crate::services::observer::{SweepItem, WorkItem};
use crate::services::resolver::resolve;
use crate::services::submission::{self, SweepRequest};
use crate::services::validation::split_list;

#[derive(Args, Debug)]
pub struct SweepArgs {
    #[command(subcommand)]
    pub command: SweepCommands,
}

#[derive(Subcommand, Debug)]
pub enum SweepCommands {
    /// Submit a parameter sweep
    Create {
        #[command(flatten)]
        project: ProjectArg,
        /// Build name or ID
        #[arg(long)]
        build_id: String,
        #[command(flatten)]
        experiences: ExperienceFlags,
        /// Metrics build name or ID
        #[arg(long)]
        metrics_build_id: Option<String>,
        /// Name of the single parameter to sweep
        #[arg(long)]
        parameter_name: Option<String>,
        /// Values of the single parameter (comma-separated)
        #[arg(long, value_delimiter = ',')]
        parameter_values: Vec<String>,
        /// JSON file describing a multi-parameter grid search
        #[arg(long)]
        grid_search_config: Option<PathBuf>,
        #[arg(long, value_delimiter = ',')]
        pool_labels: Vec<String>,
        #[arg(long)]
        account: Option<String>,
        /// Sweep name
        #[arg(long)]
        name: Option<String>,
    },
    /// Show a sweep, or exit with its status code
    Get {
        #[command(flatten)]
        project: ProjectArg,
        /// Sweep name or ID
        #[arg(long)]
        sweep: String,
        /// Print nothing and exit with the sweep status code
        #[arg(long)]
        exit_status: bool,
    },
    /// List sweeps
    List {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// Cancel a sweep and its batches
    Cancel {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        sweep: String,
    },
}

#[derive(Debug, Serialize)]
pub struct SweepListOutput {
    pub sweeps: Vec<Sweep>,
}

impl CommandOutput for SweepListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "status", "batches", "created"]);
        for sweep in &self.sweeps {
            table.add_row(vec![
                Cell::new(sweep.id),
                Cell::new(truncate(&sweep.name, 32)),
                Cell::new(colorize_status(sweep.status)),
                Cell::new(sweep.batch_ids.len()),
                Cell::new(timestamp(sweep.creation_timestamp.as_ref())),
            ]);
        }
        render_list("sweep", "sweeps", &table, self.sweeps.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.sweeps).unwrap_or_default()
    }
}

pub async fn execute(args: SweepArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    match args.command {
        SweepCommands::Create {
            project,
            build_id,
            experiences,
            metrics_build_id,
            parameter_name,
            parameter_values,
            grid_search_config,
            pool_labels,
            account,
            name,
        } => {
            let request = SweepRequest {
                build: build_id,
                experiences: experiences.into(),
                metrics_build: metrics_build_id,
                parameter_name,
                parameter_values: split_list(&parameter_values),
                grid_search_config,
                pool_labels: split_list(&pool_labels),
                account,
                name,
            };
            request.grid()?;
            let project = ctx.project_id(project.as_deref()).await?;
            let (sweep, expected) = submission::submit_sweep(platform, project, request).await?;
            Created::named(EntityKind::Sweep, &sweep.name, sweep.id)
                .with_detail("Expected batches", expected)
                .print(ctx.output());
        }
        SweepCommands::Get {
            project,
            sweep,
            exit_status,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let sweep = resolve::<Sweep>(platform, project, &sweep).await?;
            if exit_status {
                return Ok(CiExit::from_status(sweep.status));
            }
            print_record(&sweep)?;
        }
        SweepCommands::List { project } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let sweeps = platform
                .list_sweeps(project, None)
                .await
                .context("failed to list sweeps")?;
            output(&SweepListOutput { sweeps }, ctx.output().json);
        }
        SweepCommands::Cancel { project, sweep } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let sweep = resolve::<Sweep>(platform, project, &sweep).await?;
            SweepItem {
                project,
                id: sweep.id,
            }
            .cancel(platform)
            .await?;
            output(
                &ActionOutput::new("Cancelled", EntityKind::Sweep, sweep.id, Some(sweep.name)),
                ctx.output().json,
            );
        }
    }
    Ok(CiExit::Success)
}
