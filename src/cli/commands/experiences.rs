//! Experience CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{joined, list_table, render_list};
use crate::cli::exit::CiExit;
use crate::cli::output::{
    output, print_record, truncate, ActionOutput, CommandOutput, Created, MessageOutput,
};
use crate::domain::models::requests::ExperienceFilter;
use crate::domain::models::{EntityKind, Experience};
use crate::services::catalog::{self, ExperienceSpec, Membership};
use crate::services::resolver::resolve;
use crate::services::validation::split_list;

#[derive(Args, Debug)]
pub struct ExperienceArgs {
    #[command(subcommand)]
    pub command: ExperienceCommands,
}

/// Experience fields shared by create and update.
#[derive(Args, Debug, Clone, Default)]
pub struct ExperienceFields {
    #[arg(long)]
    pub description: Option<String>,
    /// Storage locations (repeatable or comma-separated)
    #[arg(long = "locations", visible_alias = "location", value_delimiter = ',')]
    pub locations: Vec<String>,
    /// Container timeout in seconds (default 3600)
    #[arg(long = "timeout", allow_negative_numbers = true)]
    pub timeout_secs: Option<i64>,
    /// Profile passed to the experience container
    #[arg(long)]
    pub profile: Option<String>,
    /// Environment variables as NAME=VALUE (repeatable)
    #[arg(long = "env")]
    pub environment: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ExperienceCommands {
    /// Create a new experience
    Create {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        name: String,
        #[command(flatten)]
        fields: ExperienceFields,
        /// Systems to register the experience with (names or IDs)
        #[arg(long, value_delimiter = ',')]
        systems: Vec<String>,
    },
    /// Update fields of an experience
    Update {
        #[command(flatten)]
        project: ProjectArg,
        /// Experience name or ID
        #[arg(long)]
        experience: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ExperienceFields,
    },
    /// Show an experience
    Get {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        experience: String,
    },
    /// List experiences
    List {
        #[command(flatten)]
        project: ProjectArg,
        /// List archived experiences instead
        #[arg(long)]
        archived: bool,
    },
    /// Archive an experience
    Archive {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        experience: String,
    },
    /// Restore an archived experience
    Restore {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        experience: String,
    },
    /// Add an experience to a tag
    Tag {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        experience: String,
        /// Tag name or ID
        #[arg(long = "tag")]
        tag: String,
    },
    /// Remove an experience from a tag
    Untag {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        experience: String,
        #[arg(long = "tag")]
        tag: String,
    },
    /// Register an experience with a system
    AddSystem {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        experience: String,
        #[arg(long)]
        system: String,
    },
    /// Remove an experience from a system
    RemoveSystem {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        experience: String,
        #[arg(long)]
        system: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ExperienceListOutput {
    pub experiences: Vec<Experience>,
}

impl CommandOutput for ExperienceListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "locations", "timeout", "description"]);
        for experience in &self.experiences {
            table.add_row(vec![
                Cell::new(experience.id),
                Cell::new(&experience.name),
                Cell::new(truncate(&joined(&experience.locations), 48)),
                Cell::new(format!("{}s", experience.container_timeout_seconds)),
                Cell::new(truncate(&experience.description, 32)),
            ]);
        }
        render_list("experience", "experiences", &table, self.experiences.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.experiences).unwrap_or_default()
    }
}

fn spec(name: Option<String>, fields: ExperienceFields, systems: Vec<String>) -> ExperienceSpec {
    ExperienceSpec {
        name: name.unwrap_or_default(),
        description: fields.description.unwrap_or_default(),
        locations: split_list(&fields.locations),
        timeout_secs: fields.timeout_secs,
        profile: fields.profile,
        environment: fields.environment,
        systems: split_list(&systems),
    }
}

pub async fn execute(args: ExperienceArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    let mode = ctx.output();
    match args.command {
        ExperienceCommands::Create {
            project,
            name,
            fields,
            systems,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let experience =
                catalog::create_experience(platform, project, spec(Some(name), fields, systems))
                    .await?;
            Created::named(EntityKind::Experience, &experience.name, experience.id).print(mode);
        }
        ExperienceCommands::Update {
            project,
            experience,
            name,
            fields,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let updated =
                catalog::update_experience(platform, project, &experience, spec(name, fields, vec![]))
                    .await?;
            output(
                &ActionOutput::new("Updated", EntityKind::Experience, updated.id, Some(updated.name)),
                mode.json,
            );
        }
        ExperienceCommands::Get {
            project,
            experience,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            print_record(&resolve::<Experience>(platform, project, &experience).await?)?;
        }
        ExperienceCommands::List { project, archived } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let filter = ExperienceFilter {
                name: None,
                archived,
            };
            let experiences = platform
                .list_experiences(project, &filter)
                .await
                .context("failed to list experiences")?;
            output(&ExperienceListOutput { experiences }, mode.json);
        }
        ExperienceCommands::Archive {
            project,
            experience,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let archived = catalog::archive_experience(platform, project, &experience).await?;
            output(
                &ActionOutput::new("Archived", EntityKind::Experience, archived.id, Some(archived.name)),
                mode.json,
            );
        }
        ExperienceCommands::Restore {
            project,
            experience,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let restored = catalog::restore_experience(platform, project, &experience).await?;
            output(
                &ActionOutput::new("Restored", EntityKind::Experience, restored.id, Some(restored.name)),
                mode.json,
            );
        }
        ExperienceCommands::Tag {
            project,
            experience,
            tag,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            catalog::change_experience_tag(platform, project, &experience, &tag, Membership::Add)
                .await?;
            output(
                &MessageOutput::new(format!("Tagged experience {experience} with {tag}")),
                mode.json,
            );
        }
        ExperienceCommands::Untag {
            project,
            experience,
            tag,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            catalog::change_experience_tag(platform, project, &experience, &tag, Membership::Remove)
                .await?;
            output(
                &MessageOutput::new(format!("Removed tag {tag} from experience {experience}")),
                mode.json,
            );
        }
        ExperienceCommands::AddSystem {
            project,
            experience,
            system,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            catalog::change_experience_system(
                platform,
                project,
                &experience,
                &system,
                Membership::Add,
            )
            .await?;
            output(
                &MessageOutput::new(format!("Registered experience {experience} with system {system}")),
                mode.json,
            );
        }
        ExperienceCommands::RemoveSystem {
            project,
            experience,
            system,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            catalog::change_experience_system(
                platform,
                project,
                &experience,
                &system,
                Membership::Remove,
            )
            .await?;
            output(
                &MessageOutput::new(format!("Removed experience {experience} from system {system}")),
                mode.json,
            );
        }
    }
    Ok(CiExit::Success)
}
