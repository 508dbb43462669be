//! Create, update and archive operations for the static records: projects,
//! branches, systems, builds, metrics builds, experiences, tags, test suites
//! and workflows.
//!
//! Every function validates its inputs locally first, then resolves any
//! name-or-ID references, then issues the mutating call.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, ValidationError};
use crate::domain::models::requests::{
    BuildUpdate, ExperienceUpdate, NewBranch, NewBuild, NewExperience, NewExperienceTag,
    NewMetricsBuild, NewProject, NewSystem, NewTestSuite, NewWorkflow, SuiteRevision,
    SystemUpdate, WorkflowSuiteEntry, WorkflowUpdate,
};
use crate::domain::models::{
    Architecture, Branch, BranchType, Build, EntityKind, EnvironmentVariable, Experience,
    ExperienceTag, MetricsBuild, Project, ResourceRequirements, System, TestSuite, Workflow,
    DEFAULT_EXPERIENCE_TIMEOUT_SECS,
};
use crate::domain::ports::{Platform, PlatformError};
use crate::services::resolver::{
    resolve, resolve_archived_experience, resolve_id, resolve_ids,
};
use crate::services::validation::{
    at_least, exclusive, one_required, require_non_empty, validate_image_uri,
};

// ---------------------------------------------------------------------------
// Projects and branches
// ---------------------------------------------------------------------------

/// Create a project. Names are unique across the account.
pub async fn create_project(
    platform: &dyn Platform,
    name: &str,
    description: &str,
) -> DomainResult<Project> {
    require_non_empty("project name", name)?;
    require_non_empty("project description", description)?;
    let request = NewProject {
        name: name.trim().to_string(),
        description: description.to_string(),
    };
    let project = platform
        .create_project(&request)
        .await
        .map_err(DomainError::on_create(EntityKind::Project, name))?;
    info!(project_id = %project.id, "created project");
    Ok(project)
}

/// Archive a live project. Archiving an unknown or already archived name
/// fails to resolve.
pub async fn archive_project(platform: &dyn Platform, key: &str) -> DomainResult<Project> {
    let project = resolve::<Project>(platform, (), key).await?;
    if project.archived {
        return Err(DomainError::NotFound {
            kind: EntityKind::Project,
            key: key.to_string(),
        });
    }
    platform
        .archive_project(project.id)
        .await
        .map_err(DomainError::remote("archive", EntityKind::Project))?;
    info!(project_id = %project.id, "archived project");
    Ok(project)
}

/// Create a branch, rejecting blank names before any request.
pub async fn create_branch(
    platform: &dyn Platform,
    project: Uuid,
    name: &str,
    branch_type: BranchType,
) -> DomainResult<Branch> {
    require_non_empty("branch name", name)?;
    let request = NewBranch {
        name: name.trim().to_string(),
        branch_type,
    };
    platform
        .create_branch(project, &request)
        .await
        .map_err(DomainError::on_create(EntityKind::Branch, name))
}

/// Resolve `key` to a branch, creating a change-request branch of that name
/// when it is missing and `auto_create` is set.
pub async fn find_or_create_branch(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
    auto_create: bool,
) -> DomainResult<Branch> {
    match resolve::<Branch>(platform, project, key).await {
        Ok(branch) => Ok(branch),
        Err(DomainError::NotFound { .. }) if auto_create && Uuid::parse_str(key).is_err() => {
            info!(branch = key, "branch not found, creating it");
            create_branch(platform, project, key, BranchType::ChangeRequest).await
        }
        Err(DomainError::NotFound { .. }) => Err(DomainError::Precondition(format!(
            "Branch does not exist: {key}. Pass --auto-create-branch to create it"
        ))),
        Err(err) => Err(err),
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

fn validate_resources(prefix: &str, resources: &ResourceRequirements) -> Result<(), ValidationError> {
    at_least(&format!("{prefix} vCPUs"), 1, i64::from(resources.vcpus))?;
    at_least(&format!("{prefix} memory MiB"), 1, i64::from(resources.memory_mib))?;
    at_least(
        &format!("{prefix} shared memory MB"),
        1,
        i64::from(resources.shared_memory_mb),
    )
}

/// Inputs for `systems create`.
#[derive(Debug, Clone)]
pub struct SystemSpec {
    pub name: String,
    pub description: String,
    pub build_resources: ResourceRequirements,
    pub metrics_build_resources: ResourceRequirements,
    pub architecture: Architecture,
}

/// Create a system after checking both resource requirements.
pub async fn create_system(
    platform: &dyn Platform,
    project: Uuid,
    spec: SystemSpec,
) -> DomainResult<System> {
    require_non_empty("system name", &spec.name)?;
    require_non_empty("system description", &spec.description)?;
    validate_resources("build", &spec.build_resources)?;
    validate_resources("metrics build", &spec.metrics_build_resources)?;
    let request = NewSystem {
        name: spec.name.trim().to_string(),
        description: spec.description,
        build_resources: spec.build_resources,
        metrics_build_resources: spec.metrics_build_resources,
        architecture: spec.architecture,
    };
    platform
        .create_system(project, &request)
        .await
        .map_err(DomainError::on_create(EntityKind::System, &spec.name))
}

/// Apply the set fields of `update` to the system `key` names.
pub async fn update_system(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
    update: SystemUpdate,
) -> DomainResult<System> {
    if let Some(name) = &update.name {
        require_non_empty("system name", name)?;
    }
    if let Some(resources) = &update.build_resources {
        validate_resources("build", resources)?;
    }
    if let Some(resources) = &update.metrics_build_resources {
        validate_resources("metrics build", resources)?;
    }
    let system = resolve::<System>(platform, project, key).await?;
    platform
        .update_system(project, system.id, &update)
        .await
        .map_err(DomainError::remote("update", EntityKind::System))
}

pub async fn archive_system(platform: &dyn Platform, project: Uuid, key: &str) -> DomainResult<System> {
    let system = resolve::<System>(platform, project, key).await?;
    platform
        .archive_system(project, system.id)
        .await
        .map_err(DomainError::remote("archive", EntityKind::System))?;
    Ok(system)
}

// ---------------------------------------------------------------------------
// Builds
// ---------------------------------------------------------------------------

/// Inputs for `builds create`.
#[derive(Debug, Clone, Default)]
pub struct BuildSpec {
    pub system: String,
    pub branch: String,
    pub name: Option<String>,
    pub description: String,
    pub version: String,
    pub image: Option<String>,
    /// Path to a compose file whose contents become the build specification.
    pub build_spec: Option<PathBuf>,
    pub auto_create_branch: bool,
}

impl BuildSpec {
    /// Exactly one of `image` or `build_spec`, and a tagged image URI.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("system name or ID", &self.system)?;
        require_non_empty("branch name or ID", &self.branch)?;
        require_non_empty("build version", &self.version)?;
        let group = [
            ("image", self.image.is_some()),
            ("build-spec", self.build_spec.is_some()),
        ];
        exclusive(&group)?;
        one_required(&group)?;
        if let Some(image) = &self.image {
            validate_image_uri(image)?;
        }
        Ok(())
    }
}

/// Create a build, creating its branch first when allowed.
pub async fn create_build(
    platform: &dyn Platform,
    project: Uuid,
    spec: BuildSpec,
) -> DomainResult<Build> {
    spec.validate()?;
    let build_specification = match &spec.build_spec {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ValidationError::Unreadable {
                    path: path.clone(),
                    reason: e.to_string(),
                })?,
        ),
        None => None,
    };
    let system = resolve_id::<System>(platform, project, &spec.system).await?;
    let branch = find_or_create_branch(platform, project, &spec.branch, spec.auto_create_branch)
        .await?;
    let request = NewBuild {
        branch_id: branch.id,
        system_id: system,
        name: spec.name.unwrap_or_else(|| spec.version.clone()),
        description: spec.description,
        version: spec.version.trim().to_string(),
        image_uri: spec.image,
        build_specification,
    };
    debug!(branch = %branch.id, %system, version = %request.version, "creating build");
    platform
        .create_build(project, &request)
        .await
        .map_err(DomainError::remote("create", EntityKind::Build))
}

pub async fn update_build(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
    branch: Option<&str>,
    description: Option<String>,
    name: Option<String>,
) -> DomainResult<Build> {
    let build = resolve::<Build>(platform, project, key).await?;
    let branch_id = match branch {
        Some(branch) => Some(resolve_id::<Branch>(platform, project, branch).await?),
        None => None,
    };
    let update = BuildUpdate {
        branch_id,
        description,
        name,
    };
    platform
        .update_build(project, build.id, &update)
        .await
        .map_err(DomainError::remote("update", EntityKind::Build))
}

// ---------------------------------------------------------------------------
// Metrics builds
// ---------------------------------------------------------------------------

/// Register a metrics build image for the given systems.
pub async fn create_metrics_build(
    platform: &dyn Platform,
    project: Uuid,
    name: &str,
    image: &str,
    version: &str,
    systems: &[String],
) -> DomainResult<MetricsBuild> {
    require_non_empty("metrics build name", name)?;
    require_non_empty("metrics build version", version)?;
    validate_image_uri(image)?;
    let system_ids = resolve_ids::<System>(platform, project, systems).await?;
    let request = NewMetricsBuild {
        name: name.trim().to_string(),
        image_uri: image.to_string(),
        version: version.to_string(),
        system_ids,
    };
    platform
        .create_metrics_build(project, &request)
        .await
        .map_err(DomainError::on_create(EntityKind::MetricsBuild, name))
}

/// Direction of a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Add,
    Remove,
}

impl Membership {
    const fn verb(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

fn membership_error<'a>(
    membership: Membership,
    member: EntityKind,
    member_key: &'a str,
    owner: EntityKind,
    owner_key: &'a str,
) -> impl FnOnce(PlatformError) -> DomainError + 'a {
    move |cause| {
        let preposition = match membership {
            Membership::Add => "to",
            Membership::Remove => "from",
        };
        let hint = match (&cause, membership) {
            (PlatformError::Conflict(_), Membership::Add) => "; it may already be registered",
            (PlatformError::NotFound(_), Membership::Remove) => "; it may not be registered",
            _ => "",
        };
        DomainError::Precondition(format!(
            "failed to {} {member} {member_key} {preposition} {owner} {owner_key}{hint}: {cause}",
            membership.verb()
        ))
    }
}

/// Add or remove one system from a metrics build.
pub async fn change_metrics_build_system(
    platform: &dyn Platform,
    project: Uuid,
    metrics_build: &str,
    system: &str,
    membership: Membership,
) -> DomainResult<()> {
    let metrics_build_id = resolve_id::<MetricsBuild>(platform, project, metrics_build).await?;
    let system_id = resolve_id::<System>(platform, project, system).await?;
    let result = match membership {
        Membership::Add => {
            platform
                .add_system_to_metrics_build(project, metrics_build_id, system_id)
                .await
        }
        Membership::Remove => {
            platform
                .remove_system_from_metrics_build(project, metrics_build_id, system_id)
                .await
        }
    };
    result.map_err(membership_error(
        membership,
        EntityKind::System,
        system,
        EntityKind::MetricsBuild,
        metrics_build,
    ))
}

// ---------------------------------------------------------------------------
// Experiences and tags
// ---------------------------------------------------------------------------

/// Parse `NAME=VALUE` environment variable flags.
pub fn parse_environment(values: &[String]) -> Result<Vec<EnvironmentVariable>, ValidationError> {
    let mut variables: Vec<EnvironmentVariable> = Vec::with_capacity(values.len());
    for value in values {
        let Some((name, content)) = value.split_once('=') else {
            return Err(ValidationError::invalid(
                "environment variable (expected NAME=VALUE)",
                value,
            ));
        };
        let name = name.trim();
        require_non_empty("environment variable name", name)?;
        if variables.iter().any(|v| v.name == name) {
            return Err(ValidationError::DuplicateParameter(name.to_string()));
        }
        variables.push(EnvironmentVariable {
            name: name.to_string(),
            value: content.to_string(),
        });
    }
    Ok(variables)
}

/// Inputs for `experiences create` and `experiences update`.
#[derive(Debug, Clone, Default)]
pub struct ExperienceSpec {
    pub name: String,
    pub description: String,
    pub locations: Vec<String>,
    /// Container timeout. The platform default applies when unset.
    pub timeout_secs: Option<i64>,
    pub profile: Option<String>,
    /// `NAME=value` pairs.
    pub environment: Vec<String>,
    pub systems: Vec<String>,
}

/// Create an experience, resolving every system it is compatible with.
pub async fn create_experience(
    platform: &dyn Platform,
    project: Uuid,
    spec: ExperienceSpec,
) -> DomainResult<Experience> {
    require_non_empty("experience name", &spec.name)?;
    require_non_empty("experience description", &spec.description)?;
    if spec.locations.is_empty() {
        return Err(ValidationError::empty("experience location").into());
    }
    for location in &spec.locations {
        require_non_empty("experience location", location)?;
    }
    let timeout = match spec.timeout_secs {
        Some(secs) => {
            at_least("timeout seconds", 1, secs)?;
            u32::try_from(secs).map_err(|e| ValidationError::parse("timeout", secs.to_string(), e))?
        }
        None => DEFAULT_EXPERIENCE_TIMEOUT_SECS,
    };
    let environment_variables = parse_environment(&spec.environment)?;
    let system_ids = resolve_ids::<System>(platform, project, &spec.systems).await?;

    let request = NewExperience {
        name: spec.name.trim().to_string(),
        description: spec.description,
        locations: spec.locations,
        container_timeout_seconds: timeout,
        profile: spec.profile.filter(|p| !p.trim().is_empty()),
        environment_variables,
        system_ids,
    };
    platform
        .create_experience(project, &request)
        .await
        .map_err(DomainError::on_create(EntityKind::Experience, &spec.name))
}

pub async fn update_experience(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
    spec: ExperienceSpec,
) -> DomainResult<Experience> {
    let experience = resolve::<Experience>(platform, project, key).await?;
    let timeout = match spec.timeout_secs {
        Some(secs) => {
            at_least("timeout seconds", 1, secs)?;
            Some(u32::try_from(secs).map_err(|e| ValidationError::parse("timeout", secs.to_string(), e))?)
        }
        None => None,
    };
    let update = ExperienceUpdate {
        name: Some(spec.name).filter(|n| !n.trim().is_empty()),
        description: Some(spec.description).filter(|d| !d.is_empty()),
        locations: Some(spec.locations).filter(|l| !l.is_empty()),
        container_timeout_seconds: timeout,
        profile: spec.profile,
        environment_variables: if spec.environment.is_empty() {
            None
        } else {
            Some(parse_environment(&spec.environment)?)
        },
    };
    if update.is_empty() {
        return Err(ValidationError::empty("experience update (no fields given)").into());
    }
    platform
        .update_experience(project, experience.id, &update)
        .await
        .map_err(DomainError::remote("update", EntityKind::Experience))
}

/// Archived experiences drop out of listings and new batches.
pub async fn archive_experience(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
) -> DomainResult<Experience> {
    let experience = resolve::<Experience>(platform, project, key).await?;
    platform
        .archive_experience(project, experience.id)
        .await
        .map_err(DomainError::remote("archive", EntityKind::Experience))?;
    Ok(experience)
}

pub async fn restore_experience(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
) -> DomainResult<Experience> {
    let experience = resolve_archived_experience(platform, project, key).await?;
    platform
        .restore_experience(project, experience.id)
        .await
        .map_err(DomainError::remote("restore", EntityKind::Experience))?;
    Ok(experience)
}

/// Add or remove one system from an experience's compatible set.
pub async fn change_experience_system(
    platform: &dyn Platform,
    project: Uuid,
    experience: &str,
    system: &str,
    membership: Membership,
) -> DomainResult<()> {
    let experience_id = resolve_id::<Experience>(platform, project, experience).await?;
    let system_id = resolve_id::<System>(platform, project, system).await?;
    let result = match membership {
        Membership::Add => {
            platform
                .add_system_to_experience(project, experience_id, system_id)
                .await
        }
        Membership::Remove => {
            platform
                .remove_system_from_experience(project, experience_id, system_id)
                .await
        }
    };
    result.map_err(membership_error(
        membership,
        EntityKind::System,
        system,
        EntityKind::Experience,
        experience,
    ))
}

pub async fn create_experience_tag(
    platform: &dyn Platform,
    project: Uuid,
    name: &str,
    description: &str,
) -> DomainResult<ExperienceTag> {
    require_non_empty("experience tag name", name)?;
    let request = NewExperienceTag {
        name: name.trim().to_string(),
        description: description.to_string(),
    };
    platform
        .create_experience_tag(project, &request)
        .await
        .map_err(DomainError::on_create(EntityKind::ExperienceTag, name))
}

/// Resolve each tag name, creating any that are missing.
pub async fn ensure_experience_tags(
    platform: &dyn Platform,
    project: Uuid,
    names: &[String],
) -> DomainResult<Vec<ExperienceTag>> {
    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let tag = match resolve::<ExperienceTag>(platform, project, name).await {
            Ok(tag) => tag,
            Err(DomainError::NotFound { .. }) => {
                create_experience_tag(platform, project, name, "").await?
            }
            Err(err) => return Err(err),
        };
        if !tags.iter().any(|t: &ExperienceTag| t.id == tag.id) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// Tag or untag one experience.
pub async fn change_experience_tag(
    platform: &dyn Platform,
    project: Uuid,
    experience: &str,
    tag: &str,
    membership: Membership,
) -> DomainResult<()> {
    let experience_id = resolve_id::<Experience>(platform, project, experience).await?;
    let tag_id = resolve_id::<ExperienceTag>(platform, project, tag).await?;
    let result = match membership {
        Membership::Add => platform.tag_experience(project, tag_id, experience_id).await,
        Membership::Remove => platform.untag_experience(project, tag_id, experience_id).await,
    };
    result.map_err(membership_error(
        membership,
        EntityKind::Experience,
        experience,
        EntityKind::ExperienceTag,
        tag,
    ))
}

// ---------------------------------------------------------------------------
// Test suites
// ---------------------------------------------------------------------------

/// Inputs for `suites create`.
#[derive(Debug, Clone, Default)]
pub struct SuiteSpec {
    pub name: String,
    pub description: String,
    pub system: String,
    pub experiences: Vec<String>,
    pub metrics_build: Option<String>,
    pub show_on_summary: bool,
    pub metrics_set_name: Option<String>,
}

/// Create a test suite over the given experiences.
pub async fn create_suite(
    platform: &dyn Platform,
    project: Uuid,
    spec: SuiteSpec,
) -> DomainResult<TestSuite> {
    require_non_empty("test suite name", &spec.name)?;
    require_non_empty("test suite description", &spec.description)?;
    require_non_empty("system name or ID", &spec.system)?;
    if spec.experiences.is_empty() {
        return Err(ValidationError::empty("test suite experiences").into());
    }
    let system_id = resolve_id::<System>(platform, project, &spec.system).await?;
    let experience_ids = resolve_ids::<Experience>(platform, project, &spec.experiences).await?;
    let metrics_build_id = match &spec.metrics_build {
        Some(key) => Some(resolve_id::<MetricsBuild>(platform, project, key).await?),
        None => None,
    };
    let request = NewTestSuite {
        name: spec.name.trim().to_string(),
        description: spec.description,
        system_id,
        experience_ids,
        metrics_build_id,
        show_on_summary: spec.show_on_summary,
        metrics_set_name: spec.metrics_set_name.filter(|n| !n.is_empty()),
    };
    platform
        .create_suite(project, &request)
        .await
        .map_err(DomainError::on_create(EntityKind::TestSuite, &spec.name))
}

/// Changes for the next suite revision. `None` fields keep their value;
/// an empty `metrics_set_name` clears it.
#[derive(Debug, Clone, Default)]
pub struct SuiteRevisionSpec {
    pub name: Option<String>,
    pub description: Option<String>,
    pub system: Option<String>,
    pub experiences: Option<Vec<String>>,
    pub metrics_build: Option<String>,
    pub show_on_summary: Option<bool>,
    pub metrics_set_name: Option<String>,
}

/// Publish the next revision of a suite. At least one field must be set.
pub async fn revise_suite(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
    spec: SuiteRevisionSpec,
) -> DomainResult<TestSuite> {
    if let Some(name) = &spec.name {
        require_non_empty("test suite name", name)?;
    }
    if spec.experiences.as_ref().is_some_and(Vec::is_empty) {
        return Err(ValidationError::empty("test suite experiences").into());
    }
    let unchanged = spec.name.is_none()
        && spec.description.is_none()
        && spec.system.is_none()
        && spec.experiences.is_none()
        && spec.metrics_build.is_none()
        && spec.show_on_summary.is_none()
        && spec.metrics_set_name.is_none();
    if unchanged {
        return Err(ValidationError::empty("test suite revision (no fields given)").into());
    }
    let suite = resolve::<TestSuite>(platform, project, key).await?;
    let mut revision = SuiteRevision {
        name: spec.name,
        description: spec.description,
        show_on_summary: spec.show_on_summary,
        metrics_set_name: spec.metrics_set_name,
        ..Default::default()
    };
    if let Some(system) = &spec.system {
        revision.system_id = Some(resolve_id::<System>(platform, project, system).await?);
    }
    if let Some(experiences) = &spec.experiences {
        revision.experience_ids =
            Some(resolve_ids::<Experience>(platform, project, experiences).await?);
    }
    if let Some(metrics_build) = &spec.metrics_build {
        revision.metrics_build_id =
            Some(resolve_id::<MetricsBuild>(platform, project, metrics_build).await?);
    }
    let revised = platform
        .revise_suite(project, suite.id, &revision)
        .await
        .map_err(DomainError::remote("revise", EntityKind::TestSuite))?;
    info!(suite = %revised.id, revision = revised.revision, "revised test suite");
    Ok(revised)
}

pub async fn archive_suite(platform: &dyn Platform, project: Uuid, key: &str) -> DomainResult<TestSuite> {
    let suite = resolve::<TestSuite>(platform, project, key).await?;
    platform
        .archive_suite(project, suite.id)
        .await
        .map_err(DomainError::remote("archive", EntityKind::TestSuite))?;
    Ok(suite)
}

/// Restore an archived suite. Archived suites are addressed by ID.
pub async fn restore_suite(platform: &dyn Platform, project: Uuid, key: &str) -> DomainResult<TestSuite> {
    let suite = resolve::<TestSuite>(platform, project, key).await?;
    platform
        .restore_suite(project, suite.id)
        .await
        .map_err(DomainError::remote("restore", EntityKind::TestSuite))?;
    Ok(suite)
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

/// One entry of the workflow suites document:
/// `[{"testSuite": "<name or ID>", "enabled": true}, ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSuiteSpec {
    pub test_suite: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

/// Parse and check the JSON suites document of a workflow.
pub fn parse_workflow_suites(text: &str) -> Result<Vec<WorkflowSuiteSpec>, ValidationError> {
    let suites: Vec<WorkflowSuiteSpec> = serde_json::from_str(text)
        .map_err(|e| ValidationError::parse("workflow suites", "<json>", e))?;
    if suites.is_empty() {
        return Err(ValidationError::empty("workflow suites"));
    }
    for suite in &suites {
        require_non_empty("workflow test suite", &suite.test_suite)?;
    }
    Ok(suites)
}

async fn resolve_workflow_suites(
    platform: &dyn Platform,
    project: Uuid,
    suites: &[WorkflowSuiteSpec],
) -> DomainResult<Vec<WorkflowSuiteEntry>> {
    let mut entries = Vec::with_capacity(suites.len());
    for suite in suites {
        entries.push(WorkflowSuiteEntry {
            test_suite_id: resolve_id::<TestSuite>(platform, project, &suite.test_suite).await?,
            enabled: suite.enabled,
        });
    }
    Ok(entries)
}

/// Create a workflow over the given suites.
pub async fn create_workflow(
    platform: &dyn Platform,
    project: Uuid,
    name: &str,
    description: &str,
    ci_link: Option<String>,
    suites: &[WorkflowSuiteSpec],
) -> DomainResult<Workflow> {
    require_non_empty("workflow name", name)?;
    require_non_empty("workflow description", description)?;
    if suites.is_empty() {
        return Err(ValidationError::empty("workflow suites").into());
    }
    let request = NewWorkflow {
        name: name.trim().to_string(),
        description: description.to_string(),
        ci_workflow_link: ci_link.filter(|l| !l.trim().is_empty()),
        suites: resolve_workflow_suites(platform, project, suites).await?,
    };
    platform
        .create_workflow(project, &request)
        .await
        .map_err(DomainError::on_create(EntityKind::Workflow, name))
}

pub async fn update_workflow(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
    name: Option<String>,
    description: Option<String>,
    ci_link: Option<String>,
    suites: Option<&[WorkflowSuiteSpec]>,
) -> DomainResult<Workflow> {
    if let Some(name) = &name {
        require_non_empty("workflow name", name)?;
    }
    let workflow = resolve::<Workflow>(platform, project, key).await?;
    let suites = match suites {
        Some(suites) => Some(resolve_workflow_suites(platform, project, suites).await?),
        None => None,
    };
    let update = WorkflowUpdate {
        name,
        description,
        ci_workflow_link: ci_link,
        suites,
    };
    platform
        .update_workflow(project, workflow.id, &update)
        .await
        .map_err(DomainError::remote("update", EntityKind::Workflow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlatform;

    async fn setup() -> (InMemoryPlatform, Uuid) {
        let platform = InMemoryPlatform::new();
        let project = create_project(&platform, "P1", "d").await.unwrap();
        (platform, project.id)
    }

    fn system_spec(name: &str) -> SystemSpec {
        SystemSpec {
            name: name.into(),
            description: "d".into(),
            build_resources: ResourceRequirements::default(),
            metrics_build_resources: ResourceRequirements::default(),
            architecture: Architecture::Amd64,
        }
    }

    #[tokio::test]
    async fn test_duplicate_project_name_conflicts() {
        let (platform, _) = setup().await;
        let err = create_project(&platform, "P1", "again").await.unwrap_err();
        assert!(err.to_string().contains("project name matches an existing"));
    }

    #[tokio::test]
    async fn test_archive_twice_fails_to_find() {
        let (platform, _) = setup().await;
        archive_project(&platform, "P1").await.unwrap();
        let err = archive_project(&platform, "P1").await.unwrap_err();
        assert!(err.to_string().contains("failed to find project"));
    }

    #[tokio::test]
    async fn test_zero_vcpus_rejected_before_request() {
        let (platform, project) = setup().await;
        let before = platform.request_count();
        let mut spec = system_spec("S1");
        spec.build_resources.vcpus = 0;
        let err = create_system(&platform, project, spec).await.unwrap_err();
        assert!(err.to_string().contains("build vCPUs must be at least 1"));
        assert_eq!(platform.request_count(), before);
    }

    #[tokio::test]
    async fn test_build_requires_existing_branch_unless_auto_created() {
        let (platform, project) = setup().await;
        create_system(&platform, project, system_spec("S1")).await.unwrap();
        let spec = BuildSpec {
            system: "S1".into(),
            branch: "B1".into(),
            description: "d".into(),
            version: "1.0.0".into(),
            image: Some("public.ecr.aws/x:latest".into()),
            ..Default::default()
        };

        let err = create_build(&platform, project, spec.clone()).await.unwrap_err();
        assert!(err.to_string().contains("Branch does not exist"));

        let build = create_build(
            &platform,
            project,
            BuildSpec {
                auto_create_branch: true,
                ..spec
            },
        )
        .await
        .unwrap();
        assert_eq!(build.version, "1.0.0");
        let branch = resolve::<Branch>(&platform, project, "B1").await.unwrap();
        assert_eq!(branch.branch_type, BranchType::ChangeRequest);
    }

    #[test]
    fn test_build_image_and_spec_are_exclusive() {
        let spec = BuildSpec {
            system: "S1".into(),
            branch: "B1".into(),
            version: "1".into(),
            image: Some("repo/x:1".into()),
            build_spec: Some(PathBuf::from("compose.yml")),
            ..Default::default()
        };
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive parameters"));
    }

    #[test]
    fn test_untagged_image_rejected() {
        let spec = BuildSpec {
            system: "S1".into(),
            branch: "B1".into(),
            version: "1".into(),
            image: Some("public.ecr.aws/x".into()),
            ..Default::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(ValidationError::UntaggedImage(_))
        ));
    }

    #[tokio::test]
    async fn test_suite_revisions_increment() {
        let (platform, project) = setup().await;
        create_system(&platform, project, system_spec("S1")).await.unwrap();
        for name in ["E1", "E2"] {
            create_experience(
                &platform,
                project,
                ExperienceSpec {
                    name: name.into(),
                    description: "d".into(),
                    locations: vec![format!("s3://bucket/{name}")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }
        let suite = create_suite(
            &platform,
            project,
            SuiteSpec {
                name: "nightly".into(),
                description: "d".into(),
                system: "S1".into(),
                experiences: vec!["E1".into()],
                metrics_set_name: Some("core".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(suite.revision, 0);

        let revised = revise_suite(
            &platform,
            project,
            "nightly",
            SuiteRevisionSpec {
                experiences: Some(vec!["E1".into(), "E2".into()]),
                metrics_set_name: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(revised.revision, 1);
        assert_eq!(revised.experience_ids.len(), 2);
        assert_eq!(revised.metrics_set_name, None);
    }

    #[tokio::test]
    async fn test_empty_revision_rejected() {
        let (platform, project) = setup().await;
        let before = platform.request_count();
        let err = revise_suite(&platform, project, "nightly", SuiteRevisionSpec::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty test suite revision"));
        assert_eq!(platform.request_count(), before);
    }

    #[test]
    fn test_parse_environment() {
        let vars = parse_environment(&["A=1".into(), "B=x=y".into()]).unwrap();
        assert_eq!(vars[1].value, "x=y");
        assert!(parse_environment(&["A".into()]).is_err());
        assert!(parse_environment(&["A=1".into(), "A=2".into()]).is_err());
    }

    #[test]
    fn test_parse_workflow_suites() {
        let suites =
            parse_workflow_suites(r#"[{"testSuite": "nightly"}, {"testSuite": "smoke", "enabled": false}]"#)
                .unwrap();
        assert!(suites[0].enabled);
        assert!(!suites[1].enabled);
        assert!(parse_workflow_suites("[]").is_err());
    }
}
