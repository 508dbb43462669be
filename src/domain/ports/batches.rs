//! Batches, jobs, logs, sweeps and debug sessions.

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::PlatformResult;
use crate::domain::models::requests::{NewBatch, NewDebugSession, NewSweep};
use crate::domain::models::{Batch, DebugSession, Job, JobLog, Sweep};

/// Batches, their jobs and logs, sweeps and debug sessions.
#[async_trait]
pub trait BatchesApi: Send + Sync {
    async fn create_batch(&self, project: Uuid, request: &NewBatch) -> PlatformResult<Batch>;

    async fn get_batch(&self, project: Uuid, id: Uuid) -> PlatformResult<Batch>;

    async fn list_batches(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Batch>>;

    async fn list_jobs(&self, project: Uuid, batch: Uuid) -> PlatformResult<Vec<Job>>;

    async fn list_job_logs(&self, project: Uuid, batch: Uuid, job: Uuid)
        -> PlatformResult<Vec<JobLog>>;

    /// Download log content from its pre-signed location.
    async fn fetch_log(&self, log: &JobLog) -> PlatformResult<Vec<u8>>;

    async fn cancel_batch(&self, project: Uuid, id: Uuid) -> PlatformResult<()>;

    /// Re-execute the given jobs in place. The batch keeps its ID and
    /// returns to a non-terminal status.
    async fn rerun_batch(&self, project: Uuid, id: Uuid, jobs: &[Uuid]) -> PlatformResult<()>;

    async fn create_sweep(&self, project: Uuid, request: &NewSweep) -> PlatformResult<Sweep>;

    async fn get_sweep(&self, project: Uuid, id: Uuid) -> PlatformResult<Sweep>;

    async fn list_sweeps(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Sweep>>;

    async fn cancel_sweep(&self, project: Uuid, id: Uuid) -> PlatformResult<()>;

    async fn create_debug_session(
        &self,
        project: Uuid,
        request: &NewDebugSession,
    ) -> PlatformResult<DebugSession>;
}
