//! Job log commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use super::batches::BatchRef;
use super::reports::LogListOutput;
use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::exit::CiExit;
use crate::cli::output::output;
use crate::domain::models::Batch;
use crate::services::log_download::{download_logs, list_job_logs, select_logs};
use crate::services::resolver::resolve;
use crate::services::validation::{parse_uuid, split_list};

#[derive(Args, Debug)]
pub struct LogArgs {
    #[command(subcommand)]
    pub command: LogCommands,
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// List the log files of a job
    List {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        batch: BatchRef,
        #[arg(long)]
        job_id: String,
    },
    /// Download the log files of a job
    Download {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        batch: BatchRef,
        #[arg(long)]
        job_id: String,
        /// Only these files (comma-separated)
        #[arg(long, value_delimiter = ',')]
        files: Vec<String>,
        /// Directory to write into
        #[arg(long)]
        output: PathBuf,
    },
}

pub async fn execute(args: LogArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    match args.command {
        LogCommands::List {
            project,
            batch,
            job_id,
        } => {
            let key = batch.key()?;
            let job = parse_uuid("job ID", &job_id)?;
            let project = ctx.project_id(project.as_deref()).await?;
            let batch = resolve::<Batch>(platform, project, &key).await?;
            let logs = list_job_logs(platform, project, batch.id, job).await?;
            output(&LogListOutput { logs }, ctx.output().json);
        }
        LogCommands::Download {
            project,
            batch,
            job_id,
            files,
            output: directory,
        } => {
            let key = batch.key()?;
            let job = parse_uuid("job ID", &job_id)?;
            let files = split_list(&files);
            let project = ctx.project_id(project.as_deref()).await?;
            let batch = resolve::<Batch>(platform, project, &key).await?;
            let logs = select_logs(list_job_logs(platform, project, batch.id, job).await?, &files)?;
            let written = download_logs(platform, &logs, &directory).await?;
            if ctx.output().json {
                println!("{}", serde_json::to_string_pretty(&written)?);
            } else {
                println!("Downloaded {} file(s) to {}", written.len(), directory.display());
                for path in &written {
                    println!("  {}", path.display());
                }
            }
        }
    }
    Ok(CiExit::Success)
}
