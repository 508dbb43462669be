//! Experience tag CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::experiences::ExperienceListOutput;
use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{list_table, render_list};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, truncate, CommandOutput, Created};
use crate::domain::models::{EntityKind, ExperienceTag};
use crate::services::catalog;
use crate::services::resolver::resolve;

#[derive(Args, Debug)]
pub struct ExperienceTagArgs {
    #[command(subcommand)]
    pub command: ExperienceTagCommands,
}

#[derive(Subcommand, Debug)]
pub enum ExperienceTagCommands {
    /// Create a new experience tag
    Create {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List experience tags
    List {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// List the experiences carrying a tag
    ListExperiences {
        #[command(flatten)]
        project: ProjectArg,
        /// Tag name or ID
        #[arg(long = "tag")]
        tag: String,
    },
}

#[derive(Debug, Serialize)]
pub struct TagListOutput {
    pub tags: Vec<ExperienceTag>,
}

impl CommandOutput for TagListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "description"]);
        for tag in &self.tags {
            table.add_row(vec![
                Cell::new(tag.id),
                Cell::new(&tag.name),
                Cell::new(truncate(&tag.description, 48)),
            ]);
        }
        render_list("experience tag", "experience tags", &table, self.tags.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.tags).unwrap_or_default()
    }
}

pub async fn execute(args: ExperienceTagArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    match args.command {
        ExperienceTagCommands::Create {
            project,
            name,
            description,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let tag = catalog::create_experience_tag(platform, project, &name, &description).await?;
            Created::named(EntityKind::ExperienceTag, &tag.name, tag.id).print(ctx.output());
        }
        ExperienceTagCommands::List { project } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let tags = platform
                .list_experience_tags(project, None)
                .await
                .context("failed to list experience tags")?;
            output(&TagListOutput { tags }, ctx.output().json);
        }
        ExperienceTagCommands::ListExperiences { project, tag } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let tag = resolve::<ExperienceTag>(platform, project, &tag).await?;
            let experiences = platform
                .list_tagged_experiences(project, tag.id)
                .await
                .with_context(|| format!("failed to list experiences tagged {}", tag.name))?;
            output(&ExperienceListOutput { experiences }, ctx.output().json);
        }
    }
    Ok(CiExit::Success)
}
