//! Report CLI commands.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{colorize_status, file_size, list_table, render_list};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, print_record, truncate, CommandOutput, Created, StatusOutput};
use crate::domain::models::{EntityKind, JobLog, Report};
use crate::services::observer::{ObserveOptions, ReportItem};
use crate::services::resolver::resolve;
use crate::services::submission::{self, ReportRequest};

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Generate a report over a window of test suite batches
    Create {
        #[command(flatten)]
        project: ProjectArg,
        /// Test suite name or ID
        #[arg(long)]
        test_suite: String,
        #[arg(long)]
        revision: Option<u32>,
        /// Branch name or ID
        #[arg(long)]
        branch: String,
        /// Metrics build name or ID (defaults to the test suite's)
        #[arg(long)]
        metrics_build_id: Option<String>,
        /// Window length in days, ending now
        #[arg(long, allow_negative_numbers = true)]
        length: Option<i64>,
        /// RFC 3339 or Unix seconds
        #[arg(long)]
        start_timestamp: Option<String>,
        /// RFC 3339 or Unix seconds (defaults to now)
        #[arg(long)]
        end_timestamp: Option<String>,
        /// Only include batches from the chosen revision onward
        #[arg(long)]
        respect_revision_boundary: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        account: Option<String>,
    },
    /// Show a report, or exit with its status code
    Get {
        #[command(flatten)]
        project: ProjectArg,
        /// Report name or ID
        #[arg(long)]
        report: String,
        #[arg(long)]
        exit_status: bool,
    },
    /// List reports
    List {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// List the log files of a report
    Logs {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        report: String,
    },
    /// Wait for a report to finish and exit with its status code
    Wait {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        report: String,
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },
}

#[derive(Debug, Serialize)]
pub struct ReportListOutput {
    pub reports: Vec<Report>,
}

impl CommandOutput for ReportListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "status", "revision", "window"]);
        for report in &self.reports {
            table.add_row(vec![
                Cell::new(report.id),
                Cell::new(truncate(&report.name, 32)),
                Cell::new(colorize_status(report.status)),
                Cell::new(report.test_suite_revision),
                Cell::new(format!(
                    "{} .. {}",
                    report.start_timestamp.format("%Y-%m-%d"),
                    report.end_timestamp.format("%Y-%m-%d")
                )),
            ]);
        }
        render_list("report", "reports", &table, self.reports.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.reports).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct LogListOutput {
    pub logs: Vec<JobLog>,
}

impl CommandOutput for LogListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["file", "type", "size"]);
        for log in &self.logs {
            table.add_row(vec![
                Cell::new(&log.file_name),
                Cell::new(&log.log_type),
                Cell::new(file_size(log.file_size)),
            ]);
        }
        render_list("log file", "log files", &table, self.logs.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.logs).unwrap_or_default()
    }
}

pub async fn execute(args: ReportArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    let mode = ctx.output();
    match args.command {
        ReportCommands::Create {
            project,
            test_suite,
            revision,
            branch,
            metrics_build_id,
            length,
            start_timestamp,
            end_timestamp,
            respect_revision_boundary,
            name,
            account,
        } => {
            let request = ReportRequest {
                suite: test_suite,
                revision,
                branch,
                metrics_build: metrics_build_id,
                length_days: length,
                start: start_timestamp,
                end: end_timestamp,
                respect_revision_boundary,
                name,
                account,
            };
            request.window(chrono::Utc::now())?;
            let project = ctx.project_id(project.as_deref()).await?;
            let report = submission::create_report(platform, project, request).await?;
            Created::named(EntityKind::Report, &report.name, report.id).print(mode);
        }
        ReportCommands::Get {
            project,
            report,
            exit_status,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let report = resolve::<Report>(platform, project, &report).await?;
            if exit_status {
                return Ok(CiExit::from_status(report.status));
            }
            print_record(&report)?;
        }
        ReportCommands::List { project } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let reports = platform
                .list_reports(project, None)
                .await
                .context("failed to list reports")?;
            output(&ReportListOutput { reports }, mode.json);
        }
        ReportCommands::Logs { project, report } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let report = resolve::<Report>(platform, project, &report).await?;
            let logs = platform
                .list_report_logs(project, report.id)
                .await
                .context("failed to list report logs")?;
            output(&LogListOutput { logs }, mode.json);
        }
        ReportCommands::Wait {
            project,
            report,
            timeout,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let report = resolve::<Report>(platform, project, &report).await?;
            let options = ObserveOptions {
                deadline: timeout,
                ..Default::default()
            };
            let item = ReportItem {
                project,
                id: report.id,
            };
            let observation = ctx.observe(&item, &options, false).await?;
            if !mode.github {
                output(
                    &StatusOutput {
                        kind: EntityKind::Report,
                        id: report.id,
                        status: observation.status,
                    },
                    mode.json,
                );
            }
            return Ok(CiExit::from_status(observation.status));
        }
    }
    Ok(CiExit::Success)
}
