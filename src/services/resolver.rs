//! Name-or-ID resolution for every addressable record.
//!
//! A key that parses as a UUID is looked up by ID and may return an
//! archived record. Any other key is matched by exact name against live
//! records in the parent scope.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, ValidationError};
use crate::domain::models::requests::{BuildFilter, ExperienceFilter};
use crate::domain::models::{
    Batch, Branch, Build, EntityKind, Experience, ExperienceTag, MetricsBuild, Project, Report,
    Sweep, System, TestSuite, Workflow,
};
use crate::domain::ports::{Platform, PlatformError, PlatformResult};

/// A record that can be found by ID or by name.
#[async_trait]
pub trait Resolvable: Sized + Send {
    const KIND: EntityKind;

    /// Parent scope: `()` for projects, the project ID for everything else.
    type Scope: Copy + Send + Sync;

    async fn fetch_by_id(platform: &dyn Platform, scope: Self::Scope, id: Uuid)
        -> PlatformResult<Self>;

    /// Candidates for `name`. May include records with other names.
    async fn find_by_name(
        platform: &dyn Platform,
        scope: Self::Scope,
        name: &str,
    ) -> PlatformResult<Vec<Self>>;

    fn id(&self) -> Uuid;

    fn name(&self) -> &str;

    fn is_archived(&self) -> bool {
        false
    }
}

/// Resolve `key` to a single record of type `T`.
pub async fn resolve<T: Resolvable>(
    platform: &dyn Platform,
    scope: T::Scope,
    key: &str,
) -> DomainResult<T> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::empty(format!("{} name or ID", T::KIND)).into());
    }

    if let Ok(id) = Uuid::parse_str(key) {
        debug!(kind = %T::KIND, %id, "resolving by ID");
        return T::fetch_by_id(platform, scope, id)
            .await
            .map_err(|cause| not_found_or_remote(T::KIND, key, cause));
    }

    debug!(kind = %T::KIND, name = key, "resolving by name");
    let mut matches: Vec<T> = T::find_by_name(platform, scope, key)
        .await
        .map_err(|cause| not_found_or_remote(T::KIND, key, cause))?
        .into_iter()
        .filter(|record| record.name() == key && !record.is_archived())
        .collect();

    match matches.len() {
        0 => Err(DomainError::NotFound {
            kind: T::KIND,
            key: key.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(DomainError::Ambiguous {
            kind: T::KIND,
            key: key.to_string(),
            ids: matches.iter().map(Resolvable::id).collect(),
        }),
    }
}

/// Resolve to an ID only.
pub async fn resolve_id<T: Resolvable>(
    platform: &dyn Platform,
    scope: T::Scope,
    key: &str,
) -> DomainResult<Uuid> {
    resolve::<T>(platform, scope, key).await.map(|r| r.id())
}

/// Resolve each key in order, failing on the first miss.
pub async fn resolve_ids<T: Resolvable>(
    platform: &dyn Platform,
    scope: T::Scope,
    keys: &[String],
) -> DomainResult<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(keys.len());
    for key in keys {
        let id = resolve_id::<T>(platform, scope, key).await?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn not_found_or_remote(kind: EntityKind, key: &str, cause: PlatformError) -> DomainError {
    match cause {
        PlatformError::NotFound(_) => DomainError::NotFound {
            kind,
            key: key.to_string(),
        },
        cause => DomainError::remote("find", kind)(cause),
    }
}

/// Resolve a test suite, at `revision` when given, else the latest.
pub async fn resolve_suite(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
    revision: Option<u32>,
) -> DomainResult<TestSuite> {
    let latest = resolve::<TestSuite>(platform, project, key).await?;
    match revision {
        None => Ok(latest),
        Some(revision) if revision == latest.revision => Ok(latest),
        Some(revision) if revision > latest.revision => Err(DomainError::NotFound {
            kind: EntityKind::TestSuite,
            key: format!("{key} revision {revision}"),
        }),
        Some(revision) => platform
            .get_suite(project, latest.id, Some(revision))
            .await
            .map_err(|cause| {
                not_found_or_remote(
                    EntityKind::TestSuite,
                    &format!("{key} revision {revision}"),
                    cause,
                )
            }),
    }
}

/// Find an archived experience by name or ID, for restore.
pub async fn resolve_archived_experience(
    platform: &dyn Platform,
    project: Uuid,
    key: &str,
) -> DomainResult<Experience> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::empty("experience name or ID").into());
    }
    if Uuid::parse_str(key).is_ok() {
        return resolve::<Experience>(platform, project, key).await;
    }
    let filter = ExperienceFilter {
        name: Some(key.to_string()),
        archived: true,
    };
    platform
        .list_experiences(project, &filter)
        .await
        .map_err(|cause| not_found_or_remote(EntityKind::Experience, key, cause))?
        .into_iter()
        .find(|e| e.name == key)
        .ok_or_else(|| DomainError::NotFound {
            kind: EntityKind::Experience,
            key: key.to_string(),
        })
}

/// Find the build with `version` on `branch` for `system`, if any.
pub async fn find_build(
    platform: &dyn Platform,
    project: Uuid,
    system: Uuid,
    branch: Uuid,
    version: &str,
) -> DomainResult<Option<Build>> {
    let filter = BuildFilter {
        branch_id: Some(branch),
        system_id: Some(system),
        name: None,
    };
    let builds = platform
        .list_builds(project, &filter)
        .await
        .map_err(DomainError::remote("list", EntityKind::Build))?;
    Ok(builds
        .into_iter()
        .find(|b| b.version == version && b.system_id == system && b.branch_id == branch))
}

#[async_trait]
impl Resolvable for Project {
    const KIND: EntityKind = EntityKind::Project;
    type Scope = ();

    async fn fetch_by_id(platform: &dyn Platform, _: (), id: Uuid) -> PlatformResult<Self> {
        platform.get_project(id).await
    }

    async fn find_by_name(platform: &dyn Platform, _: (), name: &str) -> PlatformResult<Vec<Self>> {
        platform.list_projects(Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_archived(&self) -> bool {
        self.archived
    }
}

#[async_trait]
impl Resolvable for Branch {
    const KIND: EntityKind = EntityKind::Branch;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_branch(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        platform.list_branches(project, Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Resolvable for System {
    const KIND: EntityKind = EntityKind::System;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_system(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        platform.list_systems(project, Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_archived(&self) -> bool {
        self.archived
    }
}

#[async_trait]
impl Resolvable for Build {
    const KIND: EntityKind = EntityKind::Build;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_build(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        let filter = BuildFilter {
            name: Some(name.to_string()),
            ..Default::default()
        };
        platform.list_builds(project, &filter).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_archived(&self) -> bool {
        self.archived
    }
}

#[async_trait]
impl Resolvable for MetricsBuild {
    const KIND: EntityKind = EntityKind::MetricsBuild;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_metrics_build(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        platform.list_metrics_builds(project, Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Resolvable for Experience {
    const KIND: EntityKind = EntityKind::Experience;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_experience(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        let filter = ExperienceFilter {
            name: Some(name.to_string()),
            archived: false,
        };
        platform.list_experiences(project, &filter).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_archived(&self) -> bool {
        self.archived
    }
}

#[async_trait]
impl Resolvable for ExperienceTag {
    const KIND: EntityKind = EntityKind::ExperienceTag;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_experience_tag(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        platform.list_experience_tags(project, Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Resolvable for TestSuite {
    const KIND: EntityKind = EntityKind::TestSuite;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_suite(project, id, None).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        platform.list_suites(project, Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_archived(&self) -> bool {
        self.archived
    }
}

#[async_trait]
impl Resolvable for Batch {
    const KIND: EntityKind = EntityKind::Batch;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_batch(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        platform.list_batches(project, Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.friendly_name
    }
}

#[async_trait]
impl Resolvable for Sweep {
    const KIND: EntityKind = EntityKind::Sweep;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_sweep(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        platform.list_sweeps(project, Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Resolvable for Report {
    const KIND: EntityKind = EntityKind::Report;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_report(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        platform.list_reports(project, Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Resolvable for Workflow {
    const KIND: EntityKind = EntityKind::Workflow;
    type Scope = Uuid;

    async fn fetch_by_id(platform: &dyn Platform, project: Uuid, id: Uuid) -> PlatformResult<Self> {
        platform.get_workflow(project, id).await
    }

    async fn find_by_name(
        platform: &dyn Platform,
        project: Uuid,
        name: &str,
    ) -> PlatformResult<Vec<Self>> {
        platform.list_workflows(project, Some(name)).await
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_archived(&self) -> bool {
        self.archived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlatform;
    use crate::domain::models::requests::NewProject;
    use crate::domain::ports::ProjectsApi;

    async fn platform_with_project() -> (InMemoryPlatform, Project) {
        let platform = InMemoryPlatform::new();
        let project = platform
            .create_project(&NewProject {
                name: "autonomy".into(),
                description: "d".into(),
            })
            .await
            .unwrap();
        (platform, project)
    }

    #[tokio::test]
    async fn test_resolve_by_name_and_id_agree() {
        let (platform, project) = platform_with_project().await;
        let by_name = resolve::<Project>(&platform, (), "autonomy").await.unwrap();
        let by_id = resolve::<Project>(&platform, (), &project.id.to_string())
            .await
            .unwrap();
        assert_eq!(by_name, by_id);
    }

    #[tokio::test]
    async fn test_empty_key_rejected_without_request() {
        let platform = InMemoryPlatform::new();
        let err = resolve::<Project>(&platform, (), "  ").await.unwrap_err();
        assert!(err.to_string().starts_with("empty project"));
        assert_eq!(platform.request_count(), 0);
    }

    #[tokio::test]
    async fn test_archived_record_found_by_id_only() {
        let (platform, project) = platform_with_project().await;
        platform.archive_project(project.id).await.unwrap();

        let err = resolve::<Project>(&platform, (), "autonomy").await.unwrap_err();
        assert!(err.to_string().contains("failed to find project"));

        let archived = resolve::<Project>(&platform, (), &project.id.to_string())
            .await
            .unwrap();
        assert!(archived.archived);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let platform = InMemoryPlatform::new();
        let err = resolve::<Project>(&platform, (), &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
