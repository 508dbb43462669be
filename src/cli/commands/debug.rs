//! `resim debug`: start a single-experience batch and hand back cluster
//! access once its experience container is running.

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::DetailView;
use crate::cli::exit::CiExit;
use crate::cli::output::print_record;
use crate::domain::errors::DomainError;
use crate::domain::models::WorkStatus;
use crate::services::observer::{BatchItem, ObserveOptions};
use crate::services::submission::{start_debug_session, DebugRequest};
use crate::services::validation::split_list;

#[derive(Args, Debug)]
pub struct DebugArgs {
    #[command(flatten)]
    pub project: ProjectArg,
    /// Build name or ID
    #[arg(long)]
    pub build: String,
    /// Experience name or ID
    #[arg(long)]
    pub experience: String,
    /// Command to run in place of the experience entrypoint
    #[arg(long)]
    pub command: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub pool_labels: Vec<String>,
    /// Give up if the experience is not running after this long
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

pub async fn execute(args: DebugArgs, ctx: &CliContext) -> Result<CiExit> {
    let project = ctx.project_id(args.project.as_deref()).await?;
    let request = DebugRequest {
        build: args.build,
        experience: args.experience,
        command: args.command,
        pool_labels: split_list(&args.pool_labels),
    };
    let session = start_debug_session(ctx.platform(), project, request).await?;
    let item = BatchItem {
        project,
        id: session.batch_id,
    };
    let options = ObserveOptions {
        deadline: args.timeout,
        until: vec![WorkStatus::ExperiencesRunning],
        ..Default::default()
    };
    let observation = ctx.observe(&item, &options, false).await?;
    if observation.status != WorkStatus::ExperiencesRunning {
        return Err(DomainError::Precondition(format!(
            "debug batch {} ended with status {} before its experience started",
            session.batch_id, observation.status
        ))
        .into());
    }

    if ctx.output().json {
        print_record(&session)?;
    } else {
        let view = DetailView::new(format!("Debug session for batch {}", session.batch_id))
            .field("Namespace", &session.namespace)
            .field("Cluster endpoint", &session.cluster_endpoint)
            .field("Cluster CA data", &session.cluster_ca_data)
            .field("Token", &session.cluster_token);
        println!("{}", view.render());
    }
    Ok(CiExit::Success)
}
