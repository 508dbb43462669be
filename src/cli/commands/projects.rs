//! Project CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::context::CliContext;
use crate::cli::display::{list_table, render_list, timestamp};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, print_record, truncate, ActionOutput, CommandOutput, Created};
use crate::domain::models::{EntityKind, Project};
use crate::services::catalog;
use crate::services::resolver::resolve;

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    Create {
        /// Project name, unique among live projects
        #[arg(long)]
        name: String,
        /// Project description
        #[arg(long)]
        description: String,
    },
    /// List projects
    List,
    /// Show a project
    Get {
        /// Project name or ID
        #[arg(long, visible_alias = "name")]
        project: String,
    },
    /// Archive a project
    Archive {
        /// Project name or ID
        #[arg(long, visible_alias = "name")]
        project: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ProjectListOutput {
    pub projects: Vec<Project>,
}

impl CommandOutput for ProjectListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "description", "created"]);
        for project in &self.projects {
            table.add_row(vec![
                Cell::new(project.id),
                Cell::new(&project.name),
                Cell::new(truncate(&project.description, 40)),
                Cell::new(timestamp(project.creation_timestamp.as_ref())),
            ]);
        }
        render_list("project", "projects", &table, self.projects.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.projects).unwrap_or_default()
    }
}

pub async fn execute(args: ProjectArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    match args.command {
        ProjectCommands::Create { name, description } => {
            let project = catalog::create_project(platform, &name, &description).await?;
            Created::named(EntityKind::Project, &project.name, project.id).print(ctx.output());
        }
        ProjectCommands::List => {
            let projects = platform
                .list_projects(None)
                .await
                .context("failed to list projects")?;
            let projects = projects.into_iter().filter(|p| !p.archived).collect();
            output(&ProjectListOutput { projects }, ctx.output().json);
        }
        ProjectCommands::Get { project } => {
            let project = resolve::<Project>(platform, (), &project).await?;
            print_record(&project)?;
        }
        ProjectCommands::Archive { project } => {
            let project = catalog::archive_project(platform, &project).await?;
            output(
                &ActionOutput::new("Archived", EntityKind::Project, project.id, Some(project.name)),
                ctx.output().json,
            );
        }
    }
    Ok(CiExit::Success)
}
