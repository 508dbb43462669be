//! Build CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{list_table, render_list, timestamp};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, print_record, truncate, ActionOutput, CommandOutput, Created};
use crate::domain::models::requests::BuildFilter;
use crate::domain::models::{Branch, Build, EntityKind, System};
use crate::services::catalog::{self, BuildSpec};
use crate::services::resolver::resolve;

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(subcommand)]
    pub command: BuildCommands,
}

#[derive(Subcommand, Debug)]
pub enum BuildCommands {
    /// Create a new build
    Create {
        #[command(flatten)]
        project: ProjectArg,
        /// Branch name or ID
        #[arg(long)]
        branch: String,
        /// System name or ID
        #[arg(long)]
        system: String,
        /// Build name (defaults to the version)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: String,
        /// Tagged container image URI
        #[arg(long)]
        image: Option<String>,
        /// Compose file describing a multi-container build
        #[arg(long)]
        build_spec: Option<PathBuf>,
        #[arg(long)]
        version: String,
        /// Create the branch when it does not exist
        #[arg(long)]
        auto_create_branch: bool,
    },
    /// Update the branch, name or description of a build
    Update {
        #[command(flatten)]
        project: ProjectArg,
        /// Build ID
        #[arg(long)]
        build_id: String,
        /// Move the build to this branch
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// List builds
    List {
        #[command(flatten)]
        project: ProjectArg,
        /// Only builds on this branch
        #[arg(long)]
        branch: Option<String>,
        /// Only builds for this system
        #[arg(long)]
        system: Option<String>,
    },
    /// Show a build
    Get {
        #[command(flatten)]
        project: ProjectArg,
        /// Build ID or name
        #[arg(long)]
        build_id: String,
    },
}

#[derive(Debug, Serialize)]
pub struct BuildListOutput {
    pub builds: Vec<Build>,
}

impl CommandOutput for BuildListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "version", "image", "created"]);
        for build in &self.builds {
            table.add_row(vec![
                Cell::new(build.id),
                Cell::new(&build.name),
                Cell::new(&build.version),
                Cell::new(truncate(build.image_uri.as_deref().unwrap_or("(build spec)"), 48)),
                Cell::new(timestamp(build.creation_timestamp.as_ref())),
            ]);
        }
        render_list("build", "builds", &table, self.builds.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.builds).unwrap_or_default()
    }
}

pub async fn execute(args: BuildArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    match args.command {
        BuildCommands::Create {
            project,
            branch,
            system,
            name,
            description,
            image,
            build_spec,
            version,
            auto_create_branch,
        } => {
            let spec = BuildSpec {
                system,
                branch,
                name,
                description,
                version,
                image,
                build_spec,
                auto_create_branch,
            };
            spec.validate()?;
            let project = ctx.project_id(project.as_deref()).await?;
            let build = catalog::create_build(platform, project, spec).await?;
            Created::named(EntityKind::Build, &build.name, build.id).print(ctx.output());
        }
        BuildCommands::Update {
            project,
            build_id,
            branch,
            description,
            name,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let build = catalog::update_build(
                platform,
                project,
                &build_id,
                branch.as_deref(),
                description,
                name,
            )
            .await?;
            output(
                &ActionOutput::new("Updated", EntityKind::Build, build.id, Some(build.name)),
                ctx.output().json,
            );
        }
        BuildCommands::List {
            project,
            branch,
            system,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let mut filter = BuildFilter::default();
            if let Some(branch) = branch {
                filter.branch_id = Some(resolve::<Branch>(platform, project, &branch).await?.id);
            }
            if let Some(system) = system {
                filter.system_id = Some(resolve::<System>(platform, project, &system).await?.id);
            }
            let builds = platform
                .list_builds(project, &filter)
                .await
                .context("failed to list builds")?;
            output(&BuildListOutput { builds }, ctx.output().json);
        }
        BuildCommands::Get { project, build_id } => {
            let project = ctx.project_id(project.as_deref()).await?;
            print_record(&resolve::<Build>(platform, project, &build_id).await?)?;
        }
    }
    Ok(CiExit::Success)
}
