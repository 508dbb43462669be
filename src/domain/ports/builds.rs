//! Builds and metrics builds.

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::PlatformResult;
use crate::domain::models::requests::{BuildFilter, BuildUpdate, NewBuild, NewMetricsBuild};
use crate::domain::models::{Build, MetricsBuild};

/// Builds and metrics builds.
#[async_trait]
pub trait BuildsApi: Send + Sync {
    async fn list_builds(&self, project: Uuid, filter: &BuildFilter) -> PlatformResult<Vec<Build>>;

    async fn get_build(&self, project: Uuid, id: Uuid) -> PlatformResult<Build>;

    /// Fails with a conflict when the version already exists on the branch.
    async fn create_build(&self, project: Uuid, request: &NewBuild) -> PlatformResult<Build>;

    async fn update_build(
        &self,
        project: Uuid,
        id: Uuid,
        request: &BuildUpdate,
    ) -> PlatformResult<Build>;

    async fn list_metrics_builds(
        &self,
        project: Uuid,
        name: Option<&str>,
    ) -> PlatformResult<Vec<MetricsBuild>>;

    async fn get_metrics_build(&self, project: Uuid, id: Uuid) -> PlatformResult<MetricsBuild>;

    async fn create_metrics_build(
        &self,
        project: Uuid,
        request: &NewMetricsBuild,
    ) -> PlatformResult<MetricsBuild>;

    async fn add_system_to_metrics_build(
        &self,
        project: Uuid,
        metrics_build: Uuid,
        system: Uuid,
    ) -> PlatformResult<()>;

    async fn remove_system_from_metrics_build(
        &self,
        project: Uuid,
        metrics_build: Uuid,
        system: Uuid,
    ) -> PlatformResult<()>;
}
