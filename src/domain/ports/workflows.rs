//! Workflows and workflow runs.

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::PlatformResult;
use crate::domain::models::requests::{NewWorkflow, NewWorkflowRun, WorkflowUpdate};
use crate::domain::models::{Workflow, WorkflowRun};

/// Workflows and their runs.
#[async_trait]
pub trait WorkflowsApi: Send + Sync {
    async fn create_workflow(&self, project: Uuid, request: &NewWorkflow) -> PlatformResult<Workflow>;

    async fn update_workflow(
        &self,
        project: Uuid,
        id: Uuid,
        request: &WorkflowUpdate,
    ) -> PlatformResult<Workflow>;

    async fn get_workflow(&self, project: Uuid, id: Uuid) -> PlatformResult<Workflow>;

    async fn list_workflows(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Workflow>>;

    async fn create_workflow_run(
        &self,
        project: Uuid,
        workflow: Uuid,
        request: &NewWorkflowRun,
    ) -> PlatformResult<WorkflowRun>;

    async fn list_workflow_runs(&self, project: Uuid, workflow: Uuid)
        -> PlatformResult<Vec<WorkflowRun>>;

    async fn get_workflow_run(
        &self,
        project: Uuid,
        workflow: Uuid,
        run: Uuid,
    ) -> PlatformResult<WorkflowRun>;
}
