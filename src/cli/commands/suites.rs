//! Test suite CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::batches::BatchListOutput;
use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{list_table, render_list};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, print_record, truncate, ActionOutput, CommandOutput, Created};
use crate::domain::models::{EntityKind, TestSuite};
use crate::services::catalog::{self, SuiteRevisionSpec, SuiteSpec};
use crate::services::resolver::{resolve, resolve_suite};
use crate::services::submission::{self, SuiteRunRequest};
use crate::services::validation::{exclusive, split_list};

#[derive(Args, Debug)]
pub struct SuiteArgs {
    #[command(subcommand)]
    pub command: SuiteCommands,
}

#[derive(Subcommand, Debug)]
pub enum SuiteCommands {
    /// Create a new test suite
    Create {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// System name or ID
        #[arg(long)]
        system: String,
        /// Experience names or IDs (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        experiences: Vec<String>,
        /// Metrics build name or ID
        #[arg(long)]
        metrics_build: Option<String>,
        #[arg(long)]
        show_on_summary: bool,
        #[arg(long)]
        metrics_set_name: Option<String>,
    },
    /// Create a new revision of a test suite
    Revise {
        #[command(flatten)]
        project: ProjectArg,
        /// Test suite name or ID
        #[arg(long)]
        test_suite: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        system: Option<String>,
        /// Replace the experience list (comma-separated)
        #[arg(long, value_delimiter = ',')]
        experiences: Vec<String>,
        #[arg(long)]
        metrics_build: Option<String>,
        #[arg(long)]
        show_on_summary: Option<bool>,
        /// Pass an empty value to clear the metrics set
        #[arg(long)]
        metrics_set_name: Option<String>,
    },
    /// Run a test suite against a build
    Run {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        test_suite: String,
        /// Revision to run (defaults to the latest)
        #[arg(long)]
        revision: Option<u32>,
        /// Build name or ID
        #[arg(long)]
        build_id: String,
        /// Parameter as name:value (repeatable)
        #[arg(long = "parameter")]
        parameters: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        pool_labels: Vec<String>,
        #[arg(long, allow_negative_numbers = true)]
        allowable_failure_percent: Option<i64>,
        #[arg(long)]
        batch_name: Option<String>,
        #[arg(long)]
        account: Option<String>,
    },
    /// Show a test suite
    Get {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        test_suite: String,
        #[arg(long)]
        revision: Option<u32>,
        /// Show every revision
        #[arg(long)]
        all_revisions: bool,
    },
    /// List test suites
    List {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// List the batches run from a test suite
    Batches {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        test_suite: String,
        #[arg(long)]
        revision: Option<u32>,
    },
    /// Archive a test suite
    Archive {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        test_suite: String,
    },
    /// Restore an archived test suite
    Restore {
        #[command(flatten)]
        project: ProjectArg,
        /// Test suite ID
        #[arg(long)]
        test_suite: String,
    },
}

#[derive(Debug, Serialize)]
pub struct SuiteListOutput {
    pub suites: Vec<TestSuite>,
}

impl CommandOutput for SuiteListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "revision", "experiences", "description"]);
        for suite in &self.suites {
            table.add_row(vec![
                Cell::new(suite.id),
                Cell::new(&suite.name),
                Cell::new(suite.revision),
                Cell::new(suite.experience_ids.len()),
                Cell::new(truncate(&suite.description, 40)),
            ]);
        }
        render_list("test suite", "test suites", &table, self.suites.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.suites).unwrap_or_default()
    }
}

fn created(suite: &TestSuite) -> Created {
    Created::named(EntityKind::TestSuite, &suite.name, suite.id).with_revision(suite.revision)
}

pub async fn execute(args: SuiteArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    let mode = ctx.output();
    match args.command {
        SuiteCommands::Create {
            project,
            name,
            description,
            system,
            experiences,
            metrics_build,
            show_on_summary,
            metrics_set_name,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let spec = SuiteSpec {
                name,
                description,
                system,
                experiences: split_list(&experiences),
                metrics_build,
                show_on_summary,
                metrics_set_name,
            };
            let suite = catalog::create_suite(platform, project, spec).await?;
            created(&suite).print(mode);
        }
        SuiteCommands::Revise {
            project,
            test_suite,
            name,
            description,
            system,
            experiences,
            metrics_build,
            show_on_summary,
            metrics_set_name,
        } => {
            let experiences = split_list(&experiences);
            let spec = SuiteRevisionSpec {
                name,
                description,
                system,
                experiences: (!experiences.is_empty()).then_some(experiences),
                metrics_build,
                show_on_summary,
                metrics_set_name,
            };
            let project = ctx.project_id(project.as_deref()).await?;
            let suite = catalog::revise_suite(platform, project, &test_suite, spec).await?;
            created(&suite).print(mode);
        }
        SuiteCommands::Run {
            project,
            test_suite,
            revision,
            build_id,
            parameters,
            pool_labels,
            allowable_failure_percent,
            batch_name,
            account,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let request = SuiteRunRequest {
                suite: test_suite,
                revision,
                build: build_id,
                parameters,
                pool_labels: split_list(&pool_labels),
                allowable_failure_percent,
                batch_name,
                account,
            };
            let batch = submission::run_suite(platform, project, request).await?;
            Created::named(EntityKind::Batch, &batch.friendly_name, batch.id)
                .with_detail("Status", batch.status)
                .print(mode);
        }
        SuiteCommands::Get {
            project,
            test_suite,
            revision,
            all_revisions,
        } => {
            exclusive(&[("revision", revision.is_some()), ("all-revisions", all_revisions)])?;
            let project = ctx.project_id(project.as_deref()).await?;
            if all_revisions {
                let suite = resolve::<TestSuite>(platform, project, &test_suite).await?;
                let revisions = platform
                    .list_suite_revisions(project, suite.id)
                    .await
                    .context("failed to list test suite revisions")?;
                print_record(&revisions)?;
            } else {
                print_record(&resolve_suite(platform, project, &test_suite, revision).await?)?;
            }
        }
        SuiteCommands::List { project } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let suites = platform
                .list_suites(project, None)
                .await
                .context("failed to list test suites")?;
            let suites = suites.into_iter().filter(|s| !s.archived).collect();
            output(&SuiteListOutput { suites }, mode.json);
        }
        SuiteCommands::Batches {
            project,
            test_suite,
            revision,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let suite = resolve_suite(platform, project, &test_suite, revision).await?;
            let batches = platform
                .list_suite_batches(project, suite.id, revision)
                .await
                .context("failed to list test suite batches")?;
            output(&BatchListOutput { batches }, mode.json);
        }
        SuiteCommands::Archive {
            project,
            test_suite,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let suite = catalog::archive_suite(platform, project, &test_suite).await?;
            output(
                &ActionOutput::new("Archived", EntityKind::TestSuite, suite.id, Some(suite.name)),
                mode.json,
            );
        }
        SuiteCommands::Restore {
            project,
            test_suite,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let suite = catalog::restore_suite(platform, project, &test_suite).await?;
            output(
                &ActionOutput::new("Restored", EntityKind::TestSuite, suite.id, Some(suite.name)),
                mode.json,
            );
        }
    }
    Ok(CiExit::Success)
}
