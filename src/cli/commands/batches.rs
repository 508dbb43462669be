//! Batch CLI commands: submission, inspection and the wait/supervise loops.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;
use uuid::Uuid;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{colorize_job_status, colorize_status, file_size, list_table, render_list, timestamp, DetailView};
use crate::cli::exit::CiExit;
use crate::cli::output::{
    output, print_record, truncate, ActionOutput, CommandOutput, Created, StatusOutput,
};
use crate::domain::errors::ValidationError;
use crate::domain::models::{Batch, EntityKind, Job, JobLog, JobStatus};
use crate::services::observer::{BatchItem, ObserveOptions, WorkItem};
use crate::services::resolver::resolve;
use crate::services::submission::{self, BatchRequest, ExperienceSelection};
use crate::services::supervisor::{self, FailureBudget, SuperviseReport, SupervisePolicy};
use crate::services::validation::{one_required, parse_uuid, split_list};

#[derive(Args, Debug)]
pub struct BatchArgs {
    #[command(subcommand)]
    pub command: BatchCommands,
}

/// Identifies an existing batch.
#[derive(Args, Debug, Clone, Default)]
pub struct BatchRef {
    #[arg(long)]
    pub batch_id: Option<String>,
    #[arg(long)]
    pub batch_name: Option<String>,
}

impl BatchRef {
    /// The lookup key, ID first.
    pub fn key(&self) -> Result<String, ValidationError> {
        let id = self.batch_id.as_deref().map(str::trim).filter(|v| !v.is_empty());
        let name = self.batch_name.as_deref().map(str::trim).filter(|v| !v.is_empty());
        one_required(&[("batch-id", id.is_some()), ("batch-name", name.is_some())])?;
        Ok(id.or(name).unwrap_or_default().to_string())
    }
}

/// Experience selection flags shared by batches and sweeps.
#[derive(Args, Debug, Clone, Default)]
pub struct ExperienceFlags {
    /// Experience IDs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub experience_ids: Vec<String>,
    /// Experience names or IDs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub experiences: Vec<String>,
    /// Experience tag IDs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub experience_tag_ids: Vec<String>,
    /// Experience tag names (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub experience_tag_names: Vec<String>,
}

impl From<ExperienceFlags> for ExperienceSelection {
    fn from(flags: ExperienceFlags) -> Self {
        Self {
            ids: split_list(&flags.experience_ids),
            keys: split_list(&flags.experiences),
            tag_ids: split_list(&flags.experience_tag_ids),
            tag_names: split_list(&flags.experience_tag_names),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum BatchCommands {
    /// Submit a new batch
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
        /// Parameter as name:value (repeatable)
        #[arg(long = "parameter")]
        parameters: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        pool_labels: Vec<String>,
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        batch_name: Option<String>,
        /// Percent of jobs allowed to fail while the batch still succeeds (0-100)
        #[arg(long, allow_negative_numbers = true)]
        allowable_failure_percent: Option<i64>,
    },
    /// Show a batch, or exit with its status code
    Get {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        batch: BatchRef,
        /// Print nothing and exit with the batch status code
        #[arg(long)]
        exit_status: bool,
    },
    /// List the jobs of a batch
    #[command(visible_alias = "tests")]
    Jobs {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        batch: BatchRef,
    },
    /// List the log files of every job in a batch
    Logs {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        batch: BatchRef,
    },
    /// List batches
    List {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// Cancel a batch
    Cancel {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        batch: BatchRef,
    },
    /// Rerun jobs of a batch under the same batch ID
    Rerun {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        batch: BatchRef,
        /// Jobs to rerun (comma-separated). Omit to rerun the whole batch
        #[arg(long, value_delimiter = ',')]
        job_ids: Vec<String>,
    },
    /// Wait for a batch to finish and exit with its status code
    Wait {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        batch: BatchRef,
        /// Give up after this long, e.g. "30m" or "2h"
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },
    /// Wait for a batch and rerun failing jobs according to a policy
    Supervise {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        batch: BatchRef,
        #[arg(long, default_value_t = 1)]
        max_rerun_attempts: u32,
        /// Job statuses that trigger a rerun (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "ERROR")]
        rerun_on_states: Vec<JobStatus>,
        /// Abort when more than this percent of jobs would be rerun
        #[arg(long, allow_negative_numbers = true)]
        rerun_max_failure_percent: Option<i64>,
        /// Abort when more than this many jobs would be rerun
        #[arg(long, allow_negative_numbers = true)]
        max_failed_job_threshold: Option<i64>,
        /// Deadline for each wait, e.g. "1h"
        #[arg(long, value_parser = humantime::parse_duration)]
        wait_timeout: Option<Duration>,
    },
}

#[derive(Debug, Serialize)]
pub struct BatchListOutput {
    pub batches: Vec<Batch>,
}

impl CommandOutput for BatchListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "status", "build", "created"]);
        for batch in &self.batches {
            table.add_row(vec![
                Cell::new(batch.id),
                Cell::new(truncate(&batch.friendly_name, 32)),
                Cell::new(colorize_status(batch.status)),
                Cell::new(batch.build_id),
                Cell::new(timestamp(batch.creation_timestamp.as_ref())),
            ]);
        }
        render_list("batch", "batches", &table, self.batches.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.batches).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct JobListOutput {
    pub jobs: Vec<Job>,
}

impl CommandOutput for JobListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["job", "experience", "status"]);
        for job in &self.jobs {
            table.add_row(vec![
                Cell::new(job.id),
                Cell::new(truncate(&job.experience_name, 40)),
                Cell::new(colorize_job_status(job.status)),
            ]);
        }
        render_list("job", "jobs", &table, self.jobs.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.jobs).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct BatchLogsOutput {
    pub logs: Vec<(Uuid, JobLog)>,
}

impl CommandOutput for BatchLogsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["job", "file", "type", "size"]);
        for (job, log) in &self.logs {
            table.add_row(vec![
                Cell::new(job),
                Cell::new(&log.file_name),
                Cell::new(&log.log_type),
                Cell::new(file_size(log.file_size)),
            ]);
        }
        render_list("log file", "log files", &table, self.logs.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.logs
                .iter()
                .map(|(job, log)| {
                    let mut value = serde_json::to_value(log).unwrap_or_default();
                    if let Some(map) = value.as_object_mut() {
                        map.insert("jobID".into(), serde_json::Value::String(job.to_string()));
                    }
                    value
                })
                .collect(),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct SuperviseOutput {
    #[serde(flatten)]
    pub report: SuperviseReport,
    pub exit_code: i32,
}

impl CommandOutput for SuperviseOutput {
    fn to_human(&self) -> String {
        let mut view = DetailView::new(format!("Batch {}", self.report.batch_id))
            .field("Final status", colorize_status(self.report.final_status))
            .field("Rerun attempts", self.report.attempts)
            .field("Stopped", self.report.reason)
            .field("Exit code", self.exit_code);
        if !self.report.reruns.is_empty() {
            view = view.section("Reruns");
            for (n, jobs) in self.report.reruns.iter().enumerate() {
                view = view.item(format!("attempt {}: {} job(s)", n + 1, jobs.len()));
            }
        }
        view.render()
    }
}

async fn resolve_batch(ctx: &CliContext, project: &ProjectArg, batch: &BatchRef) -> Result<(Uuid, Batch)> {
    let key = batch.key()?;
    let project = ctx.project_id(project.as_deref()).await?;
    let batch = resolve::<Batch>(ctx.platform(), project, &key).await?;
    Ok((project, batch))
}

pub async fn execute(args: BatchArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    let mode = ctx.output();
    match args.command {
        BatchCommands::Create {
            project,
            build_id,
            experiences,
            metrics_build_id,
            parameters,
            pool_labels,
            account,
            batch_name,
            allowable_failure_percent,
        } => {
            let request = BatchRequest {
                build: build_id,
                experiences: experiences.into(),
                metrics_build: metrics_build_id,
                parameters,
                pool_labels: split_list(&pool_labels),
                account,
                batch_name,
                allowable_failure_percent,
            };
            request.validate()?;
            let project = ctx.project_id(project.as_deref()).await?;
            let batch = submission::submit_batch(platform, project, request).await?;
            Created::named(EntityKind::Batch, &batch.friendly_name, batch.id)
                .with_detail("Status", batch.status)
                .print(mode);
        }
        BatchCommands::Get {
            project,
            batch,
            exit_status,
        } => {
            let (_, batch) = resolve_batch(ctx, &project, &batch).await?;
            if exit_status {
                return Ok(CiExit::from_status(batch.status));
            }
            print_record(&batch)?;
        }
        BatchCommands::Jobs { project, batch } => {
            let (project, batch) = resolve_batch(ctx, &project, &batch).await?;
            let jobs = platform
                .list_jobs(project, batch.id)
                .await
                .context("failed to list jobs")?;
            output(&JobListOutput { jobs }, mode.json);
        }
        BatchCommands::Logs { project, batch } => {
            let (project, batch) = resolve_batch(ctx, &project, &batch).await?;
            let jobs = platform
                .list_jobs(project, batch.id)
                .await
                .context("failed to list jobs")?;
            let mut logs = Vec::new();
            for job in jobs {
                let job_logs = platform
                    .list_job_logs(project, batch.id, job.id)
                    .await
                    .with_context(|| format!("failed to list logs for job {}", job.id))?;
                logs.extend(job_logs.into_iter().map(|log| (job.id, log)));
            }
            output(&BatchLogsOutput { logs }, mode.json);
        }
        BatchCommands::List { project } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let batches = platform
                .list_batches(project, None)
                .await
                .context("failed to list batches")?;
            output(&BatchListOutput { batches }, mode.json);
        }
        BatchCommands::Cancel { project, batch } => {
            let (project, batch) = resolve_batch(ctx, &project, &batch).await?;
            BatchItem {
                project,
                id: batch.id,
            }
            .cancel(platform)
            .await?;
            output(
                &ActionOutput::new("Cancelled", EntityKind::Batch, batch.id, Some(batch.friendly_name)),
                mode.json,
            );
        }
        BatchCommands::Rerun {
            project,
            batch,
            job_ids,
        } => {
            let jobs = split_list(&job_ids)
                .iter()
                .map(|id| parse_uuid("job ID", id))
                .collect::<Result<Vec<_>, _>>()?;
            let (project, batch) = resolve_batch(ctx, &project, &batch).await?;
            BatchItem {
                project,
                id: batch.id,
            }
            .rerun(platform, &jobs)
            .await?;
            let action = if jobs.is_empty() {
                "Rerunning".to_string()
            } else {
                format!("Rerunning {} job(s) of", jobs.len())
            };
            output(
                &ActionOutput::new(&action, EntityKind::Batch, batch.id, Some(batch.friendly_name)),
                mode.json,
            );
        }
        BatchCommands::Wait {
            project,
            batch,
            timeout,
        } => {
            let (project, batch) = resolve_batch(ctx, &project, &batch).await?;
            let item = BatchItem {
                project,
                id: batch.id,
            };
            let options = ObserveOptions {
                deadline: timeout,
                ..Default::default()
            };
            let observation = ctx.observe(&item, &options, false).await?;
            if !mode.github {
                output(
                    &StatusOutput {
                        kind: EntityKind::Batch,
                        id: batch.id,
                        status: observation.status,
                    },
                    mode.json,
                );
            }
            return Ok(CiExit::from_status(observation.status));
        }
        BatchCommands::Supervise {
            project,
            batch,
            max_rerun_attempts,
            rerun_on_states,
            rerun_max_failure_percent,
            max_failed_job_threshold,
            wait_timeout,
        } => {
            let policy = SupervisePolicy {
                max_rerun_attempts,
                rerun_on: rerun_on_states.into_iter().collect::<BTreeSet<_>>(),
                budget: FailureBudget::from_flags(rerun_max_failure_percent, max_failed_job_threshold)?,
                wait_timeout,
            };
            policy.validate()?;
            let (project, batch) = resolve_batch(ctx, &project, &batch).await?;
            let watch = ctx.watch(format!("supervising batch {}", batch.id), false);
            let report = supervisor::supervise(
                &watch.observer,
                BatchItem {
                    project,
                    id: batch.id,
                },
                &policy,
            )
            .await?;
            drop(watch);
            let exit = CiExit::from_status(report.final_status);
            output(
                &SuperviseOutput {
                    report,
                    exit_code: exit.code(),
                },
                mode.json,
            );
            return Ok(exit);
        }
    }
    Ok(CiExit::Success)
}
