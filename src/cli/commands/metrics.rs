//! `resim metrics sync`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::exit::CiExit;
use crate::services::metrics_sync::{self, DEFAULT_METRICS_DIR};

#[derive(Args, Debug)]
pub struct MetricsArgs {
    #[command(subcommand)]
    pub command: MetricsCommands,
}

#[derive(Subcommand, Debug)]
pub enum MetricsCommands {
    /// Upload the local metrics config and templates
    Sync {
        #[command(flatten)]
        project: ProjectArg,
        /// Directory holding config.yml and templates/
        #[arg(long, default_value = DEFAULT_METRICS_DIR)]
        dir: PathBuf,
        /// Sync to this branch instead of the project default
        #[arg(long)]
        branch: Option<String>,
    },
}

pub async fn execute(args: MetricsArgs, ctx: &CliContext) -> Result<CiExit> {
    match args.command {
        MetricsCommands::Sync {
            project,
            dir,
            branch,
        } => {
            metrics_sync::load_bundle(&dir).await?;
            let project = ctx.project_id(project.as_deref()).await?;
            let uploaded = metrics_sync::sync(ctx.platform(), project, &dir, branch).await?;
            if ctx.output().json {
                println!("{}", serde_json::to_string_pretty(&uploaded)?);
            } else {
                println!("Synced metrics config with {} template(s)", uploaded.len());
            }
        }
    }
    Ok(CiExit::Success)
}
