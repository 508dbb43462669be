//! Projects, branches and systems.

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::PlatformResult;
use crate::domain::models::requests::{NewBranch, NewProject, NewSystem, SystemUpdate};
use crate::domain::models::{Branch, Build, Experience, MetricsBuild, Project, System};

/// Projects, branches and systems.
#[async_trait]
pub trait ProjectsApi: Send + Sync {
    /// List live projects, optionally filtered by exact name.
    async fn list_projects(&self, name: Option<&str>) -> PlatformResult<Vec<Project>>;

    /// Fetch a project by ID, archived or not.
    async fn get_project(&self, id: Uuid) -> PlatformResult<Project>;

    async fn create_project(&self, request: &NewProject) -> PlatformResult<Project>;

    async fn archive_project(&self, id: Uuid) -> PlatformResult<()>;

    async fn list_branches(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Branch>>;

    async fn get_branch(&self, project: Uuid, id: Uuid) -> PlatformResult<Branch>;

    async fn create_branch(&self, project: Uuid, request: &NewBranch) -> PlatformResult<Branch>;

    async fn list_systems(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<System>>;

    async fn get_system(&self, project: Uuid, id: Uuid) -> PlatformResult<System>;

    async fn create_system(&self, project: Uuid, request: &NewSystem) -> PlatformResult<System>;

    async fn update_system(
        &self,
        project: Uuid,
        id: Uuid,
        request: &SystemUpdate,
    ) -> PlatformResult<System>;

    async fn archive_system(&self, project: Uuid, id: Uuid) -> PlatformResult<()>;

    async fn list_system_builds(&self, project: Uuid, system: Uuid) -> PlatformResult<Vec<Build>>;

    async fn list_system_experiences(
        &self,
        project: Uuid,
        system: Uuid,
    ) -> PlatformResult<Vec<Experience>>;

    async fn list_system_metrics_builds(
        &self,
        project: Uuid,
        system: Uuid,
    ) -> PlatformResult<Vec<MetricsBuild>>;
}
