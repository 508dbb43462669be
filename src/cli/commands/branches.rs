//! Branch CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{list_table, render_list, timestamp};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, CommandOutput, Created};
use crate::domain::models::{Branch, BranchType, EntityKind};
use crate::services::catalog;

#[derive(Args, Debug)]
pub struct BranchArgs {
    #[command(subcommand)]
    pub command: BranchCommands,
}

#[derive(Subcommand, Debug)]
pub enum BranchCommands {
    /// Create a new branch
    Create {
        #[command(flatten)]
        project: ProjectArg,
        /// Branch name
        #[arg(long)]
        name: String,
        /// Branch type: RELEASE, MAIN or CHANGE_REQUEST
        #[arg(long = "type", default_value = "CHANGE_REQUEST")]
        branch_type: BranchType,
    },
    /// List branches in a project
    List {
        #[command(flatten)]
        project: ProjectArg,
    },
}

#[derive(Debug, Serialize)]
pub struct BranchListOutput {
    pub branches: Vec<Branch>,
}

impl CommandOutput for BranchListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "type", "created"]);
        for branch in &self.branches {
            table.add_row(vec![
                Cell::new(branch.id),
                Cell::new(&branch.name),
                Cell::new(branch.branch_type.as_str()),
                Cell::new(timestamp(branch.creation_timestamp.as_ref())),
            ]);
        }
        render_list("branch", "branches", &table, self.branches.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.branches).unwrap_or_default()
    }
}

pub async fn execute(args: BranchArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    match args.command {
        BranchCommands::Create {
            project,
            name,
            branch_type,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let branch = catalog::create_branch(platform, project, &name, branch_type).await?;
            Created::named(EntityKind::Branch, &branch.name, branch.id).print(ctx.output());
        }
        BranchCommands::List { project } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let branches = platform
                .list_branches(project, None)
                .await
                .context("failed to list branches")?;
            output(&BranchListOutput { branches }, ctx.output().json);
        }
    }
    Ok(CiExit::Success)
}
