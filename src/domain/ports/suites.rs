//! Test suites and reports.

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::PlatformResult;
use crate::domain::models::requests::{NewReport, NewTestSuite, SuiteRevision, SuiteRun};
use crate::domain::models::{Batch, JobLog, Report, TestSuite};

/// Test suites, their revisions and reports.
#[async_trait]
pub trait SuitesApi: Send + Sync {
    /// Creates revision 0.
    async fn create_suite(&self, project: Uuid, request: &NewTestSuite) -> PlatformResult<TestSuite>;

    /// Creates the next revision from the latest one.
    async fn revise_suite(
        &self,
        project: Uuid,
        id: Uuid,
        request: &SuiteRevision,
    ) -> PlatformResult<TestSuite>;

    /// Latest revision when `revision` is `None`.
    async fn get_suite(
        &self,
        project: Uuid,
        id: Uuid,
        revision: Option<u32>,
    ) -> PlatformResult<TestSuite>;

    /// Latest revision of each live suite.
    async fn list_suites(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<TestSuite>>;

    async fn list_suite_revisions(&self, project: Uuid, id: Uuid) -> PlatformResult<Vec<TestSuite>>;

    async fn archive_suite(&self, project: Uuid, id: Uuid) -> PlatformResult<()>;

    async fn restore_suite(&self, project: Uuid, id: Uuid) -> PlatformResult<()>;

    async fn run_suite(
        &self,
        project: Uuid,
        id: Uuid,
        revision: Option<u32>,
        request: &SuiteRun,
    ) -> PlatformResult<Batch>;

    async fn list_suite_batches(
        &self,
        project: Uuid,
        id: Uuid,
        revision: Option<u32>,
    ) -> PlatformResult<Vec<Batch>>;

    async fn create_report(&self, project: Uuid, request: &NewReport) -> PlatformResult<Report>;

    async fn get_report(&self, project: Uuid, id: Uuid) -> PlatformResult<Report>;

    async fn list_reports(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Report>>;

    async fn list_report_logs(&self, project: Uuid, id: Uuid) -> PlatformResult<Vec<JobLog>>;
}
