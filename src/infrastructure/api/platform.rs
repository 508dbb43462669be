use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::client::ApiClient;
use crate::domain::models::requests::{
    BuildFilter, BuildUpdate, ExperienceFilter, ExperienceUpdate, MetricsConfigUpdate, NewBatch,
    NewBranch, NewBuild, NewDebugSession, NewExperience, NewExperienceTag, NewMetricsBuild,
    NewProject, NewReport, NewSweep, NewSystem, NewTestSuite, NewWorkflow, NewWorkflowRun,
    SuiteRevision, SuiteRun, SystemUpdate, TemplateUpload, WorkflowUpdate,
};
use crate::domain::models::{
    Batch, Branch, Build, DebugSession, Experience, ExperienceTag, Job, JobLog, MetricsBuild,
    Project, Report, Sweep, System, TestSuite, Workflow, WorkflowRun,
};
use crate::domain::ports::{
    BatchesApi, BuildsApi, ExperiencesApi, MetricsConfigApi, PlatformResult, ProjectsApi,
    SuitesApi, WorkflowsApi,
};

const UPDATE_METRICS_CONFIG: &str = "mutation UpdateMetricsConfig($projectID: String!, $config: String!, $templateNames: [String!]!, $branch: String) { updateMetricsConfig(projectID: $projectID, config: $config, templateNames: $templateNames, branch: $branch) { templateUploads { name uploadUrl } } }";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsConfigVariables<'a> {
    #[serde(rename = "projectID")]
    project_id: Uuid,
    config: &'a str,
    template_names: &'a [String],
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricsConfigData {
    update_metrics_config: MetricsConfigResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricsConfigResult {
    #[serde(default)]
    template_uploads: Vec<TemplateUpload>,
}

/// REST + GraphQL implementation of every platform port
pub struct HttpPlatform {
    client: ApiClient,
}

impl HttpPlatform {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

fn project_path(project: Uuid, rest: &str) -> String {
    format!("projects/{project}/{rest}")
}

fn name_query(name: Option<&str>) -> Vec<(&'static str, String)> {
    name.map(|n| vec![("name", n.to_string())]).unwrap_or_default()
}

fn suite_path(project: Uuid, id: Uuid, revision: Option<u32>) -> String {
    match revision {
        Some(revision) => project_path(project, &format!("suites/{id}/revisions/{revision}")),
        None => project_path(project, &format!("suites/{id}")),
    }
}

#[async_trait]
impl ProjectsApi for HttpPlatform {
    async fn list_projects(&self, name: Option<&str>) -> PlatformResult<Vec<Project>> {
        Ok(self.client.list_all("projects", &name_query(name)).await?)
    }

    async fn get_project(&self, id: Uuid) -> PlatformResult<Project> {
        Ok(self.client.get(&format!("projects/{id}"), &[]).await?)
    }

    async fn create_project(&self, request: &NewProject) -> PlatformResult<Project> {
        Ok(self.client.send(Method::POST, "projects", request).await?)
    }

    async fn archive_project(&self, id: Uuid) -> PlatformResult<()> {
        Ok(self
            .client
            .send_unit(Method::DELETE, &format!("projects/{id}"), None)
            .await?)
    }

    async fn list_branches(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Branch>> {
        Ok(self
            .client
            .list_all(&project_path(project, "branches"), &name_query(name))
            .await?)
    }

    async fn get_branch(&self, project: Uuid, id: Uuid) -> PlatformResult<Branch> {
        Ok(self
            .client
            .get(&project_path(project, &format!("branches/{id}")), &[])
            .await?)
    }

    async fn create_branch(&self, project: Uuid, request: &NewBranch) -> PlatformResult<Branch> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "branches"), request)
            .await?)
    }

    async fn list_systems(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<System>> {
        Ok(self
            .client
            .list_all(&project_path(project, "systems"), &name_query(name))
            .await?)
    }

    async fn get_system(&self, project: Uuid, id: Uuid) -> PlatformResult<System> {
        Ok(self
            .client
            .get(&project_path(project, &format!("systems/{id}")), &[])
            .await?)
    }

    async fn create_system(&self, project: Uuid, request: &NewSystem) -> PlatformResult<System> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "systems"), request)
            .await?)
    }

    async fn update_system(
        &self,
        project: Uuid,
        id: Uuid,
        request: &SystemUpdate,
    ) -> PlatformResult<System> {
        Ok(self
            .client
            .send(
                Method::PATCH,
                &project_path(project, &format!("systems/{id}")),
                request,
            )
            .await?)
    }

    async fn archive_system(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        Ok(self
            .client
            .send_unit(
                Method::DELETE,
                &project_path(project, &format!("systems/{id}")),
                None,
            )
            .await?)
    }

    async fn list_system_builds(&self, project: Uuid, system: Uuid) -> PlatformResult<Vec<Build>> {
        Ok(self
            .client
            .list_all(&project_path(project, &format!("systems/{system}/builds")), &[])
            .await?)
    }

    async fn list_system_experiences(
        &self,
        project: Uuid,
        system: Uuid,
    ) -> PlatformResult<Vec<Experience>> {
        Ok(self
            .client
            .list_all(
                &project_path(project, &format!("systems/{system}/experiences")),
                &[],
            )
            .await?)
    }

    async fn list_system_metrics_builds(
        &self,
        project: Uuid,
        system: Uuid,
    ) -> PlatformResult<Vec<MetricsBuild>> {
        Ok(self
            .client
            .list_all(
                &project_path(project, &format!("systems/{system}/metricsBuilds")),
                &[],
            )
            .await?)
    }
}

#[async_trait]
impl BuildsApi for HttpPlatform {
    async fn list_builds(&self, project: Uuid, filter: &BuildFilter) -> PlatformResult<Vec<Build>> {
        let mut query = name_query(filter.name.as_deref());
        if let Some(branch) = filter.branch_id {
            query.push(("branchID", branch.to_string()));
        }
        if let Some(system) = filter.system_id {
            query.push(("systemID", system.to_string()));
        }
        Ok(self
            .client
            .list_all(&project_path(project, "builds"), &query)
            .await?)
    }

    async fn get_build(&self, project: Uuid, id: Uuid) -> PlatformResult<Build> {
        Ok(self
            .client
            .get(&project_path(project, &format!("builds/{id}")), &[])
            .await?)
    }

    async fn create_build(&self, project: Uuid, request: &NewBuild) -> PlatformResult<Build> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "builds"), request)
            .await?)
    }

    async fn update_build(
        &self,
        project: Uuid,
        id: Uuid,
        request: &BuildUpdate,
    ) -> PlatformResult<Build> {
        Ok(self
            .client
            .send(
                Method::PATCH,
                &project_path(project, &format!("builds/{id}")),
                request,
            )
            .await?)
    }

    async fn list_metrics_builds(
        &self,
        project: Uuid,
        name: Option<&str>,
    ) -> PlatformResult<Vec<MetricsBuild>> {
        Ok(self
            .client
            .list_all(&project_path(project, "metricsBuilds"), &name_query(name))
            .await?)
    }

    async fn get_metrics_build(&self, project: Uuid, id: Uuid) -> PlatformResult<MetricsBuild> {
        Ok(self
            .client
            .get(&project_path(project, &format!("metricsBuilds/{id}")), &[])
            .await?)
    }

    async fn create_metrics_build(
        &self,
        project: Uuid,
        request: &NewMetricsBuild,
    ) -> PlatformResult<MetricsBuild> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "metricsBuilds"), request)
            .await?)
    }

    async fn add_system_to_metrics_build(
        &self,
        project: Uuid,
        metrics_build: Uuid,
        system: Uuid,
    ) -> PlatformResult<()> {
        let path = project_path(project, &format!("systems/{system}/metricsBuilds/{metrics_build}"));
        Ok(self.client.send_unit(Method::POST, &path, None).await?)
    }

    async fn remove_system_from_metrics_build(
        &self,
        project: Uuid,
        metrics_build: Uuid,
        system: Uuid,
    ) -> PlatformResult<()> {
        let path = project_path(project, &format!("systems/{system}/metricsBuilds/{metrics_build}"));
        Ok(self.client.send_unit(Method::DELETE, &path, None).await?)
    }
}

#[async_trait]
impl ExperiencesApi for HttpPlatform {
    async fn list_experiences(
        &self,
        project: Uuid,
        filter: &ExperienceFilter,
    ) -> PlatformResult<Vec<Experience>> {
        let mut query = name_query(filter.name.as_deref());
        if filter.archived {
            query.push(("archived", "true".to_string()));
        }
        Ok(self
            .client
            .list_all(&project_path(project, "experiences"), &query)
            .await?)
    }

    async fn get_experience(&self, project: Uuid, id: Uuid) -> PlatformResult<Experience> {
        Ok(self
            .client
            .get(&project_path(project, &format!("experiences/{id}")), &[])
            .await?)
    }

    async fn create_experience(
        &self,
        project: Uuid,
        request: &NewExperience,
    ) -> PlatformResult<Experience> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "experiences"), request)
            .await?)
    }

    async fn update_experience(
        &self,
        project: Uuid,
        id: Uuid,
        request: &ExperienceUpdate,
    ) -> PlatformResult<Experience> {
        Ok(self
            .client
            .send(
                Method::PATCH,
                &project_path(project, &format!("experiences/{id}")),
                request,
            )
            .await?)
    }

    async fn archive_experience(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        let path = project_path(project, &format!("experiences/{id}"));
        Ok(self.client.send_unit(Method::DELETE, &path, None).await?)
    }

    async fn restore_experience(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        let path = project_path(project, &format!("experiences/{id}/restore"));
        Ok(self.client.send_unit(Method::POST, &path, None).await?)
    }

    async fn add_system_to_experience(
        &self,
        project: Uuid,
        experience: Uuid,
        system: Uuid,
    ) -> PlatformResult<()> {
        let path = project_path(project, &format!("systems/{system}/experiences/{experience}"));
        Ok(self.client.send_unit(Method::POST, &path, None).await?)
    }

    async fn remove_system_from_experience(
        &self,
        project: Uuid,
        experience: Uuid,
        system: Uuid,
    ) -> PlatformResult<()> {
        let path = project_path(project, &format!("systems/{system}/experiences/{experience}"));
        Ok(self.client.send_unit(Method::DELETE, &path, None).await?)
    }

    async fn list_experience_tags(
        &self,
        project: Uuid,
        name: Option<&str>,
    ) -> PlatformResult<Vec<ExperienceTag>> {
        Ok(self
            .client
            .list_all(&project_path(project, "experienceTags"), &name_query(name))
            .await?)
    }

    async fn get_experience_tag(&self, project: Uuid, id: Uuid) -> PlatformResult<ExperienceTag> {
        Ok(self
            .client
            .get(&project_path(project, &format!("experienceTags/{id}")), &[])
            .await?)
    }

    async fn create_experience_tag(
        &self,
        project: Uuid,
        request: &NewExperienceTag,
    ) -> PlatformResult<ExperienceTag> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "experienceTags"), request)
            .await?)
    }

    async fn tag_experience(
        &self,
        project: Uuid,
        tag: Uuid,
        experience: Uuid,
    ) -> PlatformResult<()> {
        let path = project_path(project, &format!("experienceTags/{tag}/experiences/{experience}"));
        Ok(self.client.send_unit(Method::POST, &path, None).await?)
    }

    async fn untag_experience(
        &self,
        project: Uuid,
        tag: Uuid,
        experience: Uuid,
    ) -> PlatformResult<()> {
        let path = project_path(project, &format!("experienceTags/{tag}/experiences/{experience}"));
        Ok(self.client.send_unit(Method::DELETE, &path, None).await?)
    }

    async fn list_tagged_experiences(
        &self,
        project: Uuid,
        tag: Uuid,
    ) -> PlatformResult<Vec<Experience>> {
        Ok(self
            .client
            .list_all(
                &project_path(project, &format!("experienceTags/{tag}/experiences")),
                &[],
            )
            .await?)
    }
}

#[async_trait]
impl BatchesApi for HttpPlatform {
    async fn create_batch(&self, project: Uuid, request: &NewBatch) -> PlatformResult<Batch> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "batches"), request)
            .await?)
    }

    async fn get_batch(&self, project: Uuid, id: Uuid) -> PlatformResult<Batch> {
        Ok(self
            .client
            .get(&project_path(project, &format!("batches/{id}")), &[])
            .await?)
    }

    async fn list_batches(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Batch>> {
        Ok(self
            .client
            .list_all(&project_path(project, "batches"), &name_query(name))
            .await?)
    }

    async fn list_jobs(&self, project: Uuid, batch: Uuid) -> PlatformResult<Vec<Job>> {
        Ok(self
            .client
            .list_all(&project_path(project, &format!("batches/{batch}/jobs")), &[])
            .await?)
    }

    async fn list_job_logs(
        &self,
        project: Uuid,
        batch: Uuid,
        job: Uuid,
    ) -> PlatformResult<Vec<JobLog>> {
        Ok(self
            .client
            .list_all(
                &project_path(project, &format!("batches/{batch}/jobs/{job}/logs")),
                &[],
            )
            .await?)
    }

    async fn fetch_log(&self, log: &JobLog) -> PlatformResult<Vec<u8>> {
        Ok(self.client.download(&log.location).await?)
    }

    async fn cancel_batch(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        let path = project_path(project, &format!("batches/{id}/cancel"));
        Ok(self.client.send_unit(Method::POST, &path, None).await?)
    }

    async fn rerun_batch(&self, project: Uuid, id: Uuid, jobs: &[Uuid]) -> PlatformResult<()> {
        let path = project_path(project, &format!("batches/{id}/rerun"));
        let body = json!({ "jobIDs": jobs });
        Ok(self
            .client
            .send_unit(Method::POST, &path, Some(&body))
            .await?)
    }

    async fn create_sweep(&self, project: Uuid, request: &NewSweep) -> PlatformResult<Sweep> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "sweeps"), request)
            .await?)
    }

    async fn get_sweep(&self, project: Uuid, id: Uuid) -> PlatformResult<Sweep> {
        Ok(self
            .client
            .get(&project_path(project, &format!("sweeps/{id}")), &[])
            .await?)
    }

    async fn list_sweeps(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Sweep>> {
        Ok(self
            .client
            .list_all(&project_path(project, "sweeps"), &name_query(name))
            .await?)
    }

    async fn cancel_sweep(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        let path = project_path(project, &format!("sweeps/{id}/cancel"));
        Ok(self.client.send_unit(Method::POST, &path, None).await?)
    }

    async fn create_debug_session(
        &self,
        project: Uuid,
        request: &NewDebugSession,
    ) -> PlatformResult<DebugSession> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "debugExperience"), request)
            .await?)
    }
}

#[async_trait]
impl SuitesApi for HttpPlatform {
    async fn create_suite(&self, project: Uuid, request: &NewTestSuite) -> PlatformResult<TestSuite> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "suites"), request)
            .await?)
    }

    async fn revise_suite(
        &self,
        project: Uuid,
        id: Uuid,
        request: &SuiteRevision,
    ) -> PlatformResult<TestSuite> {
        Ok(self
            .client
            .send(
                Method::POST,
                &project_path(project, &format!("suites/{id}/revise")),
                request,
            )
            .await?)
    }

    async fn get_suite(
        &self,
        project: Uuid,
        id: Uuid,
        revision: Option<u32>,
    ) -> PlatformResult<TestSuite> {
        Ok(self.client.get(&suite_path(project, id, revision), &[]).await?)
    }

    async fn list_suites(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<TestSuite>> {
        Ok(self
            .client
            .list_all(&project_path(project, "suites"), &name_query(name))
            .await?)
    }

    async fn list_suite_revisions(&self, project: Uuid, id: Uuid) -> PlatformResult<Vec<TestSuite>> {
        Ok(self
            .client
            .list_all(&project_path(project, &format!("suites/{id}/revisions")), &[])
            .await?)
    }

    async fn archive_suite(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        let path = project_path(project, &format!("suites/{id}/archive"));
        Ok(self.client.send_unit(Method::POST, &path, None).await?)
    }

    async fn restore_suite(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        let path = project_path(project, &format!("suites/{id}/restore"));
        Ok(self.client.send_unit(Method::POST, &path, None).await?)
    }

    async fn run_suite(
        &self,
        project: Uuid,
        id: Uuid,
        revision: Option<u32>,
        request: &SuiteRun,
    ) -> PlatformResult<Batch> {
        let path = format!("{}/batches", suite_path(project, id, revision));
        Ok(self.client.send(Method::POST, &path, request).await?)
    }

    async fn list_suite_batches(
        &self,
        project: Uuid,
        id: Uuid,
        revision: Option<u32>,
    ) -> PlatformResult<Vec<Batch>> {
        let path = format!("{}/batches", suite_path(project, id, revision));
        Ok(self.client.list_all(&path, &[]).await?)
    }

    async fn create_report(&self, project: Uuid, request: &NewReport) -> PlatformResult<Report> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "reports"), request)
            .await?)
    }

    async fn get_report(&self, project: Uuid, id: Uuid) -> PlatformResult<Report> {
        Ok(self
            .client
            .get(&project_path(project, &format!("reports/{id}")), &[])
            .await?)
    }

    async fn list_reports(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Report>> {
        Ok(self
            .client
            .list_all(&project_path(project, "reports"), &name_query(name))
            .await?)
    }

    async fn list_report_logs(&self, project: Uuid, id: Uuid) -> PlatformResult<Vec<JobLog>> {
        Ok(self
            .client
            .list_all(&project_path(project, &format!("reports/{id}/logs")), &[])
            .await?)
    }
}

#[async_trait]
impl WorkflowsApi for HttpPlatform {
    async fn create_workflow(&self, project: Uuid, request: &NewWorkflow) -> PlatformResult<Workflow> {
        Ok(self
            .client
            .send(Method::POST, &project_path(project, "workflows"), request)
            .await?)
    }

    async fn update_workflow(
        &self,
        project: Uuid,
        id: Uuid,
        request: &WorkflowUpdate,
    ) -> PlatformResult<Workflow> {
        Ok(self
            .client
            .send(
                Method::PATCH,
                &project_path(project, &format!("workflows/{id}")),
                request,
            )
            .await?)
    }

    async fn get_workflow(&self, project: Uuid, id: Uuid) -> PlatformResult<Workflow> {
        Ok(self
            .client
            .get(&project_path(project, &format!("workflows/{id}")), &[])
            .await?)
    }

    async fn list_workflows(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Workflow>> {
        Ok(self
            .client
            .list_all(&project_path(project, "workflows"), &name_query(name))
            .await?)
    }

    async fn create_workflow_run(
        &self,
        project: Uuid,
        workflow: Uuid,
        request: &NewWorkflowRun,
    ) -> PlatformResult<WorkflowRun> {
        Ok(self
            .client
            .send(
                Method::POST,
                &project_path(project, &format!("workflows/{workflow}/runs")),
                request,
            )
            .await?)
    }

    async fn list_workflow_runs(
        &self,
        project: Uuid,
        workflow: Uuid,
    ) -> PlatformResult<Vec<WorkflowRun>> {
        Ok(self
            .client
            .list_all(
                &project_path(project, &format!("workflows/{workflow}/runs")),
                &[],
            )
            .await?)
    }

    async fn get_workflow_run(
        &self,
        project: Uuid,
        workflow: Uuid,
        run: Uuid,
    ) -> PlatformResult<WorkflowRun> {
        Ok(self
            .client
            .get(
                &project_path(project, &format!("workflows/{workflow}/runs/{run}")),
                &[],
            )
            .await?)
    }
}

#[async_trait]
impl MetricsConfigApi for HttpPlatform {
    async fn sync_metrics_config(
        &self,
        project: Uuid,
        request: &MetricsConfigUpdate,
    ) -> PlatformResult<Vec<TemplateUpload>> {
        let variables = MetricsConfigVariables {
            project_id: project,
            config: &request.config,
            template_names: &request.template_names,
            branch: request.branch.as_deref(),
        };
        let data: MetricsConfigData = self
            .client
            .graphql(UPDATE_METRICS_CONFIG, variables)
            .await?;
        Ok(data.update_metrics_config.template_uploads)
    }

    async fn upload_template(&self, upload: &TemplateUpload, content: Vec<u8>) -> PlatformResult<()> {
        Ok(self.client.upload(&upload.upload_url, content).await?)
    }
}
