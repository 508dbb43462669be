//! `resim ingest`: run metrics over logs that were recorded elsewhere.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::exit::CiExit;
use crate::cli::output::Created;
use crate::domain::models::EntityKind;
use crate::services::ingest::{self, IngestRequest};
use crate::services::validation::split_list;

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub project: ProjectArg,
    /// Existing build to attach the ingested logs to
    #[arg(long)]
    pub build_id: Option<String>,
    /// System for the log-ingest build (instead of --build-id)
    #[arg(long)]
    pub system: Option<String>,
    /// Branch for the log-ingest build [default: log-ingest-branch]
    #[arg(long)]
    pub branch: Option<String>,
    /// Version of the log-ingest build [default: latest]
    #[arg(long)]
    pub version: Option<String>,
    /// Metrics build name or ID
    #[arg(long)]
    pub metrics_build_id: Option<String>,
    /// Name of a single log
    #[arg(long)]
    pub log_name: Option<String>,
    /// Storage location of a single log
    #[arg(long)]
    pub log_location: Option<String>,
    /// A log as name=location (repeatable)
    #[arg(long = "log")]
    pub logs: Vec<String>,
    /// YAML file with a top-level `logs:` list of {name, location}
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Extra tags for the ingested experiences (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    #[arg(long)]
    pub batch_name: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub pool_labels: Vec<String>,
    #[arg(long)]
    pub account: Option<String>,
    /// Reuse the experiences of a previous ingest
    #[arg(long)]
    pub reingest: bool,
}

pub async fn execute(args: IngestArgs, ctx: &CliContext) -> Result<CiExit> {
    let request = IngestRequest {
        build_id: args.build_id,
        system: args.system,
        branch: args.branch,
        version: args.version,
        metrics_build: args.metrics_build_id,
        log_name: args.log_name,
        log_location: args.log_location,
        logs: args.logs,
        config: args.config,
        tags: split_list(&args.tags),
        batch_name: args.batch_name,
        pool_labels: split_list(&args.pool_labels),
        account: args.account,
        reingest: args.reingest,
    };
    let sources = request.sources()?;
    let project = ctx.project_id(args.project.as_deref()).await?;
    let outcome = ingest::ingest(ctx.platform(), project, request).await?;

    if ctx.output().json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(CiExit::Success);
    }
    Created::named(EntityKind::Batch, &outcome.batch.friendly_name, outcome.batch.id)
        .with_detail("Build ID", outcome.build.id)
        .with_detail("Logs", sources.len())
        .with_detail("New experiences", outcome.created.len())
        .print(ctx.output());
    Ok(CiExit::Success)
}
