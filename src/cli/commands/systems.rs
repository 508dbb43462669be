//! System CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::ProjectArg;
use crate::cli::context::CliContext;
use crate::cli::display::{list_table, render_list};
use crate::cli::exit::CiExit;
use crate::cli::output::{output, print_record, truncate, ActionOutput, CommandOutput, Created};
use crate::domain::models::requests::SystemUpdate;
use crate::domain::models::{Architecture, EntityKind, ResourceRequirements, System};
use crate::services::catalog::{self, SystemSpec};
use crate::services::resolver::resolve;

#[derive(Args, Debug)]
pub struct SystemArgs {
    #[command(subcommand)]
    pub command: SystemCommands,
}

/// Resources for running builds on this system.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildResourceFlags {
    #[arg(long)]
    pub build_vcpus: Option<u32>,
    #[arg(long)]
    pub build_gpus: Option<u32>,
    #[arg(long)]
    pub build_memory_mib: Option<u32>,
    #[arg(long)]
    pub build_shared_memory_mb: Option<u32>,
}

/// Resources for running metrics builds on this system.
#[derive(Args, Debug, Clone, Default)]
pub struct MetricsResourceFlags {
    #[arg(long)]
    pub metrics_build_vcpus: Option<u32>,
    #[arg(long)]
    pub metrics_build_gpus: Option<u32>,
    #[arg(long)]
    pub metrics_build_memory_mib: Option<u32>,
    #[arg(long)]
    pub metrics_build_shared_memory_mb: Option<u32>,
}

fn overlay(
    base: ResourceRequirements,
    vcpus: Option<u32>,
    gpus: Option<u32>,
    memory_mib: Option<u32>,
    shared_memory_mb: Option<u32>,
) -> Option<ResourceRequirements> {
    if vcpus.is_none() && gpus.is_none() && memory_mib.is_none() && shared_memory_mb.is_none() {
        return None;
    }
    Some(ResourceRequirements {
        vcpus: vcpus.unwrap_or(base.vcpus),
        gpus: gpus.unwrap_or(base.gpus),
        memory_mib: memory_mib.unwrap_or(base.memory_mib),
        shared_memory_mb: shared_memory_mb.unwrap_or(base.shared_memory_mb),
    })
}

impl BuildResourceFlags {
    fn overlay(&self, base: ResourceRequirements) -> Option<ResourceRequirements> {
        overlay(
            base,
            self.build_vcpus,
            self.build_gpus,
            self.build_memory_mib,
            self.build_shared_memory_mb,
        )
    }
}

impl MetricsResourceFlags {
    fn overlay(&self, base: ResourceRequirements) -> Option<ResourceRequirements> {
        overlay(
            base,
            self.metrics_build_vcpus,
            self.metrics_build_gpus,
            self.metrics_build_memory_mib,
            self.metrics_build_shared_memory_mb,
        )
    }
}

#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Create a new system
    Create {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[command(flatten)]
        build: BuildResourceFlags,
        #[command(flatten)]
        metrics: MetricsResourceFlags,
        /// amd64 or arm64
        #[arg(long, default_value = "amd64")]
        architecture: Architecture,
    },
    /// Update fields of a system
    Update {
        #[command(flatten)]
        project: ProjectArg,
        /// System name or ID
        #[arg(long)]
        system: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        build: BuildResourceFlags,
        #[command(flatten)]
        metrics: MetricsResourceFlags,
        #[arg(long)]
        architecture: Option<Architecture>,
    },
    /// List systems in a project
    List {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// Show a system
    Get {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        system: String,
    },
    /// Archive a system
    Archive {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        system: String,
    },
    /// List the builds of a system
    Builds {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        system: String,
    },
    /// List the experiences registered with a system
    Experiences {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        system: String,
    },
    /// List the metrics builds registered with a system
    MetricsBuilds {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        system: String,
    },
}

#[derive(Debug, Serialize)]
pub struct SystemListOutput {
    pub systems: Vec<System>,
}

impl CommandOutput for SystemListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "architecture", "build vcpus", "description"]);
        for system in &self.systems {
            table.add_row(vec![
                Cell::new(system.id),
                Cell::new(&system.name),
                Cell::new(system.architecture),
                Cell::new(system.build_resources.vcpus),
                Cell::new(truncate(&system.description, 40)),
            ]);
        }
        render_list("system", "systems", &table, self.systems.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.systems).unwrap_or_default()
    }
}

pub async fn execute(args: SystemArgs, ctx: &CliContext) -> Result<CiExit> {
    let platform = ctx.platform();
    match args.command {
        SystemCommands::Create {
            project,
            name,
            description,
            build,
            metrics,
            architecture,
        } => {
            let defaults = ResourceRequirements::default();
            let spec = SystemSpec {
                name,
                description,
                build_resources: build.overlay(defaults).unwrap_or(defaults),
                metrics_build_resources: metrics.overlay(defaults).unwrap_or(defaults),
                architecture,
            };
            let project = ctx.project_id(project.as_deref()).await?;
            let system = catalog::create_system(platform, project, spec).await?;
            Created::named(EntityKind::System, &system.name, system.id).print(ctx.output());
        }
        SystemCommands::Update {
            project,
            system,
            name,
            description,
            build,
            metrics,
            architecture,
        } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let current = resolve::<System>(platform, project, &system).await?;
            let update = SystemUpdate {
                name,
                description,
                build_resources: build.overlay(current.build_resources),
                metrics_build_resources: metrics.overlay(current.metrics_build_resources),
                architecture,
            };
            let updated =
                catalog::update_system(platform, project, &current.id.to_string(), update).await?;
            output(
                &ActionOutput::new("Updated", EntityKind::System, updated.id, Some(updated.name)),
                ctx.output().json,
            );
        }
        SystemCommands::List { project } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let systems = platform
                .list_systems(project, None)
                .await
                .context("failed to list systems")?;
            let systems = systems.into_iter().filter(|s| !s.archived).collect();
            output(&SystemListOutput { systems }, ctx.output().json);
        }
        SystemCommands::Get { project, system } => {
            let project = ctx.project_id(project.as_deref()).await?;
            print_record(&resolve::<System>(platform, project, &system).await?)?;
        }
        SystemCommands::Archive { project, system } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let system = catalog::archive_system(platform, project, &system).await?;
            output(
                &ActionOutput::new("Archived", EntityKind::System, system.id, Some(system.name)),
                ctx.output().json,
            );
        }
        SystemCommands::Builds { project, system } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let system = resolve::<System>(platform, project, &system).await?;
            let builds = platform
                .list_system_builds(project, system.id)
                .await
                .context("failed to list builds for system")?;
            output(&super::builds::BuildListOutput { builds }, ctx.output().json);
        }
        SystemCommands::Experiences { project, system } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let system = resolve::<System>(platform, project, &system).await?;
            let experiences = platform
                .list_system_experiences(project, system.id)
                .await
                .context("failed to list experiences for system")?;
            output(
                &super::experiences::ExperienceListOutput { experiences },
                ctx.output().json,
            );
        }
        SystemCommands::MetricsBuilds { project, system } => {
            let project = ctx.project_id(project.as_deref()).await?;
            let system = resolve::<System>(platform, project, &system).await?;
            let metrics_builds = platform
                .list_system_metrics_builds(project, system.id)
                .await
                .context("failed to list metrics builds for system")?;
            output(
                &super::metrics_builds::MetricsBuildListOutput { metrics_builds },
                ctx.output().json,
            );
        }
    }
    Ok(CiExit::Success)
}
