//! Workflow and workflow run CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{colorize_status, list_table, render_list};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, print_record, truncate, ActionOutput, CommandOutput, Created};
use crate::domain::models::{EntityKind, Workflow, WorkflowRun};
use crate::services::catalog::{self, parse_workflow_suites};
use crate::services::resolver::resolve;
use crate::services::submission::{self, WorkflowRunRequest};
use crate::services::validation::{parse_uuid, split_list};

#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommands,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// Create a workflow from a set of test suites
    Create {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Link to the CI workflow that triggers this one
        #[arg(long)]
        ci_workflow_link: Option<String>,
        /// JSON list of {"testSuite": "<name or ID>", "enabled": true}
        #[arg(long)]
        suites: String,
    },
    /// Update a workflow
    Update {
        #[command(flatten)]
        project: ProjectArg,
        /// Workflow name or ID
        #[arg(long)]
        workflow: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        ci_workflow_link: Option<String>,
        /// Replace the suite list (same JSON shape as create)
        #[arg(long)]
        suites: Option<String>,
    },
    /// List workflows
    List {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// Show a workflow
    Get {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        workflow: String,
    },
    /// Workflow runs
    Runs(WorkflowRunArgs),
}

#[derive(Args, Debug)]
pub struct WorkflowRunArgs {
    #[command(subcommand)]
    pub command: WorkflowRunCommands,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowRunCommands {
    /// Run every enabled suite of a workflow against a build
    Create {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        workflow: String,
        /// Build name or ID
        #[arg(long)]
        build_id: String,
        /// Parameter as name=value (repeatable)
        #[arg(long = "parameter")]
        parameters: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        pool_labels: Vec<String>,
        #[arg(long, allow_negative_numbers = true)]
        allowable_failure_percent: Option<i64>,
        #[arg(long)]
        account: Option<String>,
    },
    /// List the runs of a workflow
    List {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        workflow: String,
    },
    /// Show a workflow run, or exit with its status code
    Get {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        workflow: String,
        #[arg(long)]
        run_id: String,
        #[arg(long)]
        exit_status: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct WorkflowListOutput {
    pub workflows: Vec<Workflow>,
}

impl CommandOutput for WorkflowListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "suites", "description"]);
        for workflow in &self.workflows {
            table.add_row(vec![
                Cell::new(workflow.id),
                Cell::new(&workflow.name),
                Cell::new(workflow.suites.iter().filter(|s| s.enabled).count()),
                Cell::new(truncate(&workflow.description, 40)),
            ]);
        }
        render_list("workflow", "workflows", &table, self.workflows.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.workflows).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct WorkflowRunListOutput {
    pub runs: Vec<WorkflowRun>,
}

impl CommandOutput for WorkflowRunListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "build", "status", "batches"]);
        for run in &self.runs {
            table.add_row(vec![
                Cell::new(run.id),
                Cell::new(run.build_id),
                Cell::new(colorize_status(run.status)),
                Cell::new(run.suites.len()),
            ]);
        }
        render_list("workflow run", "workflow runs", &table, self.runs.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.runs).unwrap_or_default()
    }
}

pub async fn execute(args: WorkflowArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    let mode = ctx.output();
    match args.command {
        WorkflowCommands::Create {
            project,
            name,
            description,
            ci_workflow_link,
            suites,
        } => {
            let suites = parse_workflow_suites(&suites)?;
            let project = ctx.project_id(project.as_deref()).await?;
            let workflow = catalog::create_workflow(
                platform,
                project,
                &name,
                &description,
                ci_workflow_link,
                &suites,
            )
            .await?;
            Created::named(EntityKind::Workflow, &workflow.name, workflow.id).print(mode);
        }
        WorkflowCommands::Update {
            project,
            workflow,
            name,
            description,
            ci_workflow_link,
            suites,
        } => {
            let suites = suites.as_deref().map(parse_workflow_suites).transpose()?;
            let project = ctx.project_id(project.as_deref()).await?;
            let updated = catalog::update_workflow(
                platform,
                project,
                &workflow,
                name,
                description,
                ci_workflow_link,
                suites.as_deref(),
            )
            .await?;
            output(
                &ActionOutput::new("Updated", EntityKind::Workflow, updated.id, Some(updated.name)),
                mode.json,
            );
        }
        WorkflowCommands::List { project } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let workflows = platform
                .list_workflows(project, None)
                .await
                .context("failed to list workflows")?;
            let workflows = workflows.into_iter().filter(|w| !w.archived).collect();
            output(&WorkflowListOutput { workflows }, mode.json);
        }
        WorkflowCommands::Get { project, workflow } => {
            let project = ctx.project_id(project.as_deref()).await?;
            print_record(&resolve::<Workflow>(platform, project, &workflow).await?)?;
        }
        WorkflowCommands::Runs(runs) => return execute_runs(runs, ctx).await,
    }
    Ok(CiExit::Success)
}

async fn execute_runs(args: WorkflowRunArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    let mode = ctx.output();
    match args.command {
        WorkflowRunCommands::Create {
            project,
            workflow,
            build_id,
            parameters,
            pool_labels,
            allowable_failure_percent,
            account,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let request = WorkflowRunRequest {
                workflow,
                build: build_id,
                parameters,
                pool_labels: split_list(&pool_labels),
                allowable_failure_percent,
                account,
            };
            let (workflow, run) = submission::run_workflow(platform, project, request).await?;
            Created::new(EntityKind::WorkflowRun, run.id)
                .with_detail("Workflow", workflow.name)
                .with_detail("Batches", run.suites.len())
                .print(mode);
        }
        WorkflowRunCommands::List { project, workflow } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let workflow = resolve::<Workflow>(platform, project, &workflow).await?;
            let runs = platform
                .list_workflow_runs(project, workflow.id)
                .await
                .context("failed to list workflow runs")?;
            output(&WorkflowRunListOutput { runs }, mode.json);
        }
        WorkflowRunCommands::Get {
            project,
            workflow,
            run_id,
            exit_status,
        } => {
            let run_id = parse_uuid("workflow run ID", &run_id)?;
            let project = ctx.project_id(project.as_deref()).await?;
            let workflow = resolve::<Workflow>(platform, project, &workflow).await?;
            let run = platform
                .get_workflow_run(project, workflow.id, run_id)
                .await
                .with_context(|| format!("failed to get workflow run {run_id}"))?;
            if exit_status {
                return Ok(CiExit::from_status(run.status));
            }
            print_record(&run)?;
        }
    }
    Ok(CiExit::Success)
}
