use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::parameters::GridSearch;
use crate::domain::models::requests::{
    BuildFilter, BuildUpdate, ExperienceFilter, ExperienceUpdate, MetricsConfigUpdate, NewBatch,
    NewBranch, NewBuild, NewDebugSession, NewExperience, NewExperienceTag, NewMetricsBuild,
    NewProject, NewReport, NewSweep, NewSystem, NewTestSuite, NewWorkflow, NewWorkflowRun,
    SuiteRevision, SuiteRun, SystemUpdate, TemplateUpload, WorkflowUpdate,
};
use crate::domain::models::{
    Batch, Branch, Build, DebugSession, Experience, ExperienceTag, Job, JobLog, JobStatus,
    MetricsBuild, ParameterMap, Project, Report, Sweep, System, TestSuite, WorkStatus, Workflow,
    WorkflowRun, WorkflowRunSuite, WorkflowSuite,
};
use crate::domain::ports::{
    BatchesApi, BuildsApi, ExperiencesApi, MetricsConfigApi, PlatformError, PlatformResult,
    ProjectsApi, SuitesApi, WorkflowsApi,
};

/// One scripted status read. `Settle` derives the terminal status from the
/// item's current state.
#[derive(Debug, Clone, Copy)]
enum Step {
    Status(WorkStatus),
    Settle,
}

fn default_steps(running: WorkStatus) -> VecDeque<Step> {
    VecDeque::from([
        Step::Status(WorkStatus::Submitted),
        Step::Status(running),
        Step::Settle,
    ])
}

/// Pop the next step, keeping the last one in place once reached.
fn advance(steps: &mut VecDeque<Step>) -> Step {
    if steps.len() > 1 {
        steps.pop_front().unwrap_or(Step::Settle)
    } else {
        steps.front().copied().unwrap_or(Step::Settle)
    }
}

#[derive(Debug, Clone)]
struct JobScript {
    outcomes: Vec<JobStatus>,
    generation: usize,
}

impl JobScript {
    fn current(&self) -> JobStatus {
        let index = self.generation.min(self.outcomes.len().saturating_sub(1));
        self.outcomes.get(index).copied().unwrap_or(JobStatus::Passed)
    }
}

#[derive(Default)]
struct State {
    projects: Vec<Project>,
    branches: Vec<Branch>,
    systems: Vec<System>,
    builds: Vec<Build>,
    metrics_builds: Vec<MetricsBuild>,
    experiences: Vec<Experience>,
    tags: Vec<ExperienceTag>,
    batches: Vec<Batch>,
    batch_steps: HashMap<Uuid, VecDeque<Step>>,
    rerun_steps: HashMap<Uuid, Vec<WorkStatus>>,
    jobs: HashMap<Uuid, Vec<Job>>,
    job_scripts: HashMap<Uuid, JobScript>,
    logs: HashMap<Uuid, Vec<(JobLog, Vec<u8>)>>,
    sweeps: Vec<Sweep>,
    sweep_steps: HashMap<Uuid, VecDeque<Step>>,
    suites: HashMap<Uuid, Vec<TestSuite>>,
    suite_order: Vec<Uuid>,
    reports: Vec<Report>,
    report_steps: HashMap<Uuid, VecDeque<Step>>,
    workflows: Vec<Workflow>,
    workflow_runs: Vec<WorkflowRun>,
    run_steps: HashMap<Uuid, VecDeque<Step>>,
    metrics_configs: Vec<(Uuid, MetricsConfigUpdate)>,
    uploads: HashMap<String, Vec<u8>>,
    cancelled: Vec<Uuid>,
    reruns: Vec<(Uuid, Vec<Uuid>)>,
    failures: VecDeque<PlatformError>,
}

impl State {
    fn project(&self, id: Uuid) -> PlatformResult<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("project", id))
    }

    fn latest_suite(&self, project: Uuid, id: Uuid) -> PlatformResult<&TestSuite> {
        self.suites
            .get(&id)
            .and_then(|revisions| revisions.last())
            .filter(|s| s.project_id == project)
            .ok_or_else(|| not_found("test suite", id))
    }

    /// Terminal batch status derived from its jobs.
    fn settle_batch(&self, batch: Uuid) -> WorkStatus {
        let jobs = self.jobs.get(&batch).map(Vec::as_slice).unwrap_or_default();
        let statuses: Vec<JobStatus> = jobs.iter().map(|j| self.job_status(j)).collect();
        if statuses.contains(&JobStatus::Error) {
            WorkStatus::Error
        } else if statuses.contains(&JobStatus::Cancelled) {
            WorkStatus::Cancelled
        } else if statuses
            .iter()
            .any(|s| matches!(s, JobStatus::Failed | JobStatus::Blocker))
        {
            WorkStatus::Failed
        } else {
            WorkStatus::Succeeded
        }
    }

    fn job_status(&self, job: &Job) -> JobStatus {
        self.job_scripts
            .get(&job.id)
            .map_or(job.status, JobScript::current)
    }

    fn settle_many(&self, batches: &[Uuid]) -> WorkStatus {
        let statuses: Vec<WorkStatus> = batches.iter().map(|b| self.batch_status(*b)).collect();
        if statuses.iter().any(|s| !s.is_terminal()) {
            WorkStatus::Running
        } else if statuses.contains(&WorkStatus::Error) {
            WorkStatus::Error
        } else if statuses.contains(&WorkStatus::Failed) {
            WorkStatus::Failed
        } else if statuses.contains(&WorkStatus::Cancelled) {
            WorkStatus::Cancelled
        } else {
            WorkStatus::Succeeded
        }
    }

    /// Current batch status without consuming a scripted step.
    fn batch_status(&self, batch: Uuid) -> WorkStatus {
        if self.cancelled.contains(&batch) {
            return WorkStatus::Cancelled;
        }
        match self.batch_steps.get(&batch).and_then(VecDeque::back) {
            Some(Step::Status(status)) => *status,
            _ => self.settle_batch(batch),
        }
    }

    /// Create a batch with one queued job per experience.
    #[allow(clippy::too_many_arguments)]
    fn launch_batch(
        &mut self,
        project: Uuid,
        build_id: Uuid,
        experience_ids: Vec<Uuid>,
        metrics_build_id: Option<Uuid>,
        parameters: ParameterMap,
        pool_labels: Vec<String>,
        allowable_failure_percent: u8,
        friendly_name: Option<String>,
    ) -> Batch {
        let id = Uuid::new_v4();
        let batch = Batch {
            id,
            project_id: project,
            friendly_name: friendly_name.unwrap_or_else(|| format!("batch-{}", &id.to_string()[..8])),
            build_id,
            experience_ids: experience_ids.clone(),
            metrics_build_id,
            parameters,
            pool_labels,
            allowable_failure_percent,
            status: WorkStatus::Submitted,
            sweep_id: None,
            test_suite_id: None,
            test_suite_revision: None,
            creation_timestamp: Some(Utc::now()),
        };
        let jobs = experience_ids
            .iter()
            .map(|experience_id| Job {
                id: Uuid::new_v4(),
                batch_id: id,
                experience_id: *experience_id,
                build_id,
                status: JobStatus::Passed,
                experience_name: self
                    .experiences
                    .iter()
                    .find(|e| e.id == *experience_id)
                    .map(|e| e.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        self.jobs.insert(id, jobs);
        self.batch_steps
            .insert(id, default_steps(WorkStatus::ExperiencesRunning));
        self.batches.push(batch.clone());
        batch
    }

    fn expand_experiences(
        &self,
        project: Uuid,
        experience_ids: &[Uuid],
        tag_ids: &[Uuid],
    ) -> PlatformResult<Vec<Uuid>> {
        let mut ids = Vec::new();
        for id in experience_ids {
            let experience = self
                .experiences
                .iter()
                .find(|e| e.id == *id && e.project_id == project)
                .ok_or_else(|| rejected(format!("experience {id} does not exist")))?;
            if experience.archived {
                return Err(rejected(format!("experience {id} is archived")));
            }
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        for tag in tag_ids {
            if !self.tags.iter().any(|t| t.id == *tag) {
                return Err(rejected(format!("experience tag {tag} does not exist")));
            }
            for experience in self
                .experiences
                .iter()
                .filter(|e| e.tag_ids.contains(tag) && !e.archived)
            {
                if !ids.contains(&experience.id) {
                    ids.push(experience.id);
                }
            }
        }
        if ids.is_empty() {
            return Err(rejected("no experiences selected".to_string()));
        }
        Ok(ids)
    }

    fn check_build(&self, project: Uuid, build: Uuid) -> PlatformResult<()> {
        if self
            .builds
            .iter()
            .any(|b| b.id == build && b.project_id == project)
        {
            Ok(())
        } else {
            Err(rejected(format!("build {build} does not exist")))
        }
    }

    fn check_metrics_build(&self, project: Uuid, metrics_build: Option<Uuid>) -> PlatformResult<()> {
        match metrics_build {
            Some(id)
                if !self
                    .metrics_builds
                    .iter()
                    .any(|m| m.id == id && m.project_id == project) =>
            {
                Err(rejected(format!("metrics build {id} does not exist")))
            }
            _ => Ok(()),
        }
    }
}

fn not_found(kind: &str, id: Uuid) -> PlatformError {
    PlatformError::NotFound(format!("{kind} {id} not found"))
}

const fn rejected(body: String) -> PlatformError {
    PlatformError::Rejected { status: 400, body }
}

fn conflict(kind: &str, name: &str) -> PlatformError {
    PlatformError::Conflict(format!("{kind} named {name} already exists"))
}

fn check_percent(percent: u8) -> PlatformResult<()> {
    if percent > 100 {
        return Err(rejected(format!(
            "allowable failure percent {percent} is out of range"
        )));
    }
    Ok(())
}

fn name_matches(candidate: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|name| candidate == name)
}

/// In-memory implementation of every platform port.
#[derive(Clone, Default)]
pub struct InMemoryPlatform {
    state: Arc<RwLock<State>>,
    requests: Arc<AtomicUsize>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of platform calls issued so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Fail the next call with `error`. Queued failures are consumed in order.
    pub async fn fail_next(&self, error: PlatformError) {
        self.state.write().await.failures.push_back(error);
    }

    /// Replace the statuses successive `get_batch` calls return. The last
    /// status repeats.
    pub async fn script_batch(&self, batch: Uuid, statuses: Vec<WorkStatus>) {
        let steps = statuses.into_iter().map(Step::Status).collect();
        self.state.write().await.batch_steps.insert(batch, steps);
    }

    /// Statuses reported after a rerun request, before the batch settles.
    pub async fn script_rerun(&self, batch: Uuid, statuses: Vec<WorkStatus>) {
        self.state.write().await.rerun_steps.insert(batch, statuses);
    }

    /// Set the terminal status of the job for `experience` in `batch`, one
    /// entry per attempt. The last entry repeats for later attempts.
    pub async fn script_job(&self, batch: Uuid, experience: Uuid, outcomes: Vec<JobStatus>) {
        let mut state = self.state.write().await;
        let job = state
            .jobs
            .get(&batch)
            .and_then(|jobs| jobs.iter().find(|j| j.experience_id == experience))
            .map(|j| j.id);
        if let Some(job) = job {
            state.job_scripts.insert(
                job,
                JobScript {
                    outcomes,
                    generation: 0,
                },
            );
        }
    }

    /// Replace the statuses successive `get_report` calls return.
    pub async fn script_report(&self, report: Uuid, statuses: Vec<WorkStatus>) {
        let steps = statuses.into_iter().map(Step::Status).collect();
        self.state.write().await.report_steps.insert(report, steps);
    }

    /// Replace the statuses successive `get_workflow_run` calls return.
    pub async fn script_workflow_run(&self, run: Uuid, statuses: Vec<WorkStatus>) {
        let steps = statuses.into_iter().map(Step::Status).collect();
        self.state.write().await.run_steps.insert(run, steps);
    }

    /// Attach a log file to a job (or report) with the given content.
    pub async fn attach_log(&self, owner: Uuid, file_name: &str, content: Vec<u8>) -> JobLog {
        let log = JobLog {
            file_name: file_name.to_string(),
            file_size: content.len() as u64,
            log_type: if file_name.ends_with(".zip") {
                "ARCHIVE_LOG".to_string()
            } else {
                "OTHER_LOG".to_string()
            },
            location: format!("memory://{owner}/{file_name}"),
        };
        self.state
            .write()
            .await
            .logs
            .entry(owner)
            .or_default()
            .push((log.clone(), content));
        log
    }

    /// Batches that received a cancel request.
    pub async fn cancelled(&self) -> Vec<Uuid> {
        self.state.read().await.cancelled.clone()
    }

    /// Every rerun request as `(batch, jobs)`.
    pub async fn reruns(&self) -> Vec<(Uuid, Vec<Uuid>)> {
        self.state.read().await.reruns.clone()
    }

    /// Content of the last metrics template uploaded as `name`.
    pub async fn uploaded(&self, name: &str) -> Option<Vec<u8>> {
        self.state.read().await.uploads.get(name).cloned()
    }

    /// Most recent metrics configuration pushed to any project.
    pub async fn last_metrics_config(&self) -> Option<MetricsConfigUpdate> {
        self.state
            .read()
            .await
            .metrics_configs
            .last()
            .map(|(_, update)| update.clone())
    }

    async fn begin(&self) -> PlatformResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.state.write().await.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProjectsApi for InMemoryPlatform {
    async fn list_projects(&self, name: Option<&str>) -> PlatformResult<Vec<Project>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .projects
            .iter()
            .filter(|p| !p.archived && name_matches(&p.name, name))
            .cloned()
            .collect())
    }

    async fn get_project(&self, id: Uuid) -> PlatformResult<Project> {
        self.begin().await?;
        self.state.read().await.project(id).cloned()
    }

    async fn create_project(&self, request: &NewProject) -> PlatformResult<Project> {
        self.begin().await?;
        let mut state = self.state.write().await;
        if state
            .projects
            .iter()
            .any(|p| !p.archived && p.name == request.name)
        {
            return Err(conflict("project", &request.name));
        }
        let project = Project {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            description: request.description.clone(),
            archived: false,
            creation_timestamp: Some(Utc::now()),
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn archive_project(&self, id: Uuid) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let project = state
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("project", id))?;
        project.archived = true;
        Ok(())
    }

    async fn list_branches(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Branch>> {
        self.begin().await?;
        let state = self.state.read().await;
        state.project(project)?;
        Ok(state
            .branches
            .iter()
            .filter(|b| b.project_id == project && name_matches(&b.name, name))
            .cloned()
            .collect())
    }

    async fn get_branch(&self, project: Uuid, id: Uuid) -> PlatformResult<Branch> {
        self.begin().await?;
        let state = self.state.read().await;
        state
            .branches
            .iter()
            .find(|b| b.id == id && b.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("branch", id))
    }

    async fn create_branch(&self, project: Uuid, request: &NewBranch) -> PlatformResult<Branch> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        if state
            .branches
            .iter()
            .any(|b| b.project_id == project && b.name == request.name)
        {
            return Err(conflict("branch", &request.name));
        }
        let branch = Branch {
            id: Uuid::new_v4(),
            project_id: project,
            name: request.name.clone(),
            branch_type: request.branch_type,
            creation_timestamp: Some(Utc::now()),
        };
        state.branches.push(branch.clone());
        Ok(branch)
    }

    async fn list_systems(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<System>> {
        self.begin().await?;
        let state = self.state.read().await;
        state.project(project)?;
        Ok(state
            .systems
            .iter()
            .filter(|s| s.project_id == project && !s.archived && name_matches(&s.name, name))
            .cloned()
            .collect())
    }

    async fn get_system(&self, project: Uuid, id: Uuid) -> PlatformResult<System> {
        self.begin().await?;
        let state = self.state.read().await;
        state
            .systems
            .iter()
            .find(|s| s.id == id && s.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("system", id))
    }

    async fn create_system(&self, project: Uuid, request: &NewSystem) -> PlatformResult<System> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        if state
            .systems
            .iter()
            .any(|s| s.project_id == project && !s.archived && s.name == request.name)
        {
            return Err(conflict("system", &request.name));
        }
        let system = System {
            id: Uuid::new_v4(),
            project_id: project,
            name: request.name.clone(),
            description: request.description.clone(),
            build_resources: request.build_resources,
            metrics_build_resources: request.metrics_build_resources,
            architecture: request.architecture,
            archived: false,
        };
        state.systems.push(system.clone());
        Ok(system)
    }

    async fn update_system(
        &self,
        project: Uuid,
        id: Uuid,
        request: &SystemUpdate,
    ) -> PlatformResult<System> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let system = state
            .systems
            .iter_mut()
            .find(|s| s.id == id && s.project_id == project)
            .ok_or_else(|| not_found("system", id))?;
        if let Some(name) = &request.name {
            system.name.clone_from(name);
        }
        if let Some(description) = &request.description {
            system.description.clone_from(description);
        }
        if let Some(resources) = request.build_resources {
            system.build_resources = resources;
        }
        if let Some(resources) = request.metrics_build_resources {
            system.metrics_build_resources = resources;
        }
        if let Some(architecture) = request.architecture {
            system.architecture = architecture;
        }
        Ok(system.clone())
    }

    async fn archive_system(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let system = state
            .systems
            .iter_mut()
            .find(|s| s.id == id && s.project_id == project)
            .ok_or_else(|| not_found("system", id))?;
        system.archived = true;
        Ok(())
    }

    async fn list_system_builds(&self, project: Uuid, system: Uuid) -> PlatformResult<Vec<Build>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .builds
            .iter()
            .filter(|b| b.project_id == project && b.system_id == system)
            .cloned()
            .collect())
    }

    async fn list_system_experiences(
        &self,
        project: Uuid,
        system: Uuid,
    ) -> PlatformResult<Vec<Experience>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .experiences
            .iter()
            .filter(|e| e.project_id == project && !e.archived && e.system_ids.contains(&system))
            .cloned()
            .collect())
    }

    async fn list_system_metrics_builds(
        &self,
        project: Uuid,
        system: Uuid,
    ) -> PlatformResult<Vec<MetricsBuild>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .metrics_builds
            .iter()
            .filter(|m| m.project_id == project && m.system_ids.contains(&system))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BuildsApi for InMemoryPlatform {
    async fn list_builds(&self, project: Uuid, filter: &BuildFilter) -> PlatformResult<Vec<Build>> {
        self.begin().await?;
        let state = self.state.read().await;
        state.project(project)?;
        Ok(state
            .builds
            .iter()
            .filter(|b| b.project_id == project)
            .filter(|b| filter.branch_id.is_none_or(|id| b.branch_id == id))
            .filter(|b| filter.system_id.is_none_or(|id| b.system_id == id))
            .filter(|b| name_matches(&b.name, filter.name.as_deref()))
            .cloned()
            .collect())
    }

    async fn get_build(&self, project: Uuid, id: Uuid) -> PlatformResult<Build> {
        self.begin().await?;
        let state = self.state.read().await;
        state
            .builds
            .iter()
            .find(|b| b.id == id && b.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("build", id))
    }

    async fn create_build(&self, project: Uuid, request: &NewBuild) -> PlatformResult<Build> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        if !state
            .branches
            .iter()
            .any(|b| b.id == request.branch_id && b.project_id == project)
        {
            return Err(rejected(format!("branch {} does not exist", request.branch_id)));
        }
        if !state
            .systems
            .iter()
            .any(|s| s.id == request.system_id && s.project_id == project)
        {
            return Err(rejected(format!("system {} does not exist", request.system_id)));
        }
        if state
            .builds
            .iter()
            .any(|b| b.branch_id == request.branch_id && b.version == request.version)
        {
            return Err(PlatformError::Conflict(format!(
                "version {} already exists on this branch",
                request.version
            )));
        }
        let build = Build {
            id: Uuid::new_v4(),
            project_id: project,
            branch_id: request.branch_id,
            system_id: request.system_id,
            name: request.name.clone(),
            description: request.description.clone(),
            version: request.version.clone(),
            image_uri: request.image_uri.clone(),
            build_specification: request.build_specification.clone(),
            archived: false,
            creation_timestamp: Some(Utc::now()),
        };
        state.builds.push(build.clone());
        Ok(build)
    }

    async fn update_build(
        &self,
        project: Uuid,
        id: Uuid,
        request: &BuildUpdate,
    ) -> PlatformResult<Build> {
        self.begin().await?;
        let mut state = self.state.write().await;
        if let Some(branch) = request.branch_id {
            if !state
                .branches
                .iter()
                .any(|b| b.id == branch && b.project_id == project)
            {
                return Err(rejected(format!("branch {branch} does not exist")));
            }
        }
        let build = state
            .builds
            .iter_mut()
            .find(|b| b.id == id && b.project_id == project)
            .ok_or_else(|| not_found("build", id))?;
        if let Some(branch) = request.branch_id {
            build.branch_id = branch;
        }
        if let Some(description) = &request.description {
            build.description.clone_from(description);
        }
        if let Some(name) = &request.name {
            build.name.clone_from(name);
        }
        Ok(build.clone())
    }

    async fn list_metrics_builds(
        &self,
        project: Uuid,
        name: Option<&str>,
    ) -> PlatformResult<Vec<MetricsBuild>> {
        self.begin().await?;
        let state = self.state.read().await;
        state.project(project)?;
        Ok(state
            .metrics_builds
            .iter()
            .filter(|m| m.project_id == project && name_matches(&m.name, name))
            .cloned()
            .collect())
    }

    async fn get_metrics_build(&self, project: Uuid, id: Uuid) -> PlatformResult<MetricsBuild> {
        self.begin().await?;
        let state = self.state.read().await;
        state
            .metrics_builds
            .iter()
            .find(|m| m.id == id && m.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("metrics build", id))
    }

    async fn create_metrics_build(
        &self,
        project: Uuid,
        request: &NewMetricsBuild,
    ) -> PlatformResult<MetricsBuild> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        let metrics_build = MetricsBuild {
            id: Uuid::new_v4(),
            project_id: project,
            name: request.name.clone(),
            image_uri: request.image_uri.clone(),
            version: request.version.clone(),
            system_ids: request.system_ids.clone(),
            creation_timestamp: Some(Utc::now()),
        };
        state.metrics_builds.push(metrics_build.clone());
        Ok(metrics_build)
    }

    async fn add_system_to_metrics_build(
        &self,
        project: Uuid,
        metrics_build: Uuid,
        system: Uuid,
    ) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let entry = state
            .metrics_builds
            .iter_mut()
            .find(|m| m.id == metrics_build && m.project_id == project)
            .ok_or_else(|| not_found("metrics build", metrics_build))?;
        if !entry.system_ids.contains(&system) {
            entry.system_ids.push(system);
        }
        Ok(())
    }

    async fn remove_system_from_metrics_build(
        &self,
        project: Uuid,
        metrics_build: Uuid,
        system: Uuid,
    ) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let entry = state
            .metrics_builds
            .iter_mut()
            .find(|m| m.id == metrics_build && m.project_id == project)
            .ok_or_else(|| not_found("metrics build", metrics_build))?;
        entry.system_ids.retain(|s| *s != system);
        Ok(())
    }
}

#[async_trait]
impl ExperiencesApi for InMemoryPlatform {
    async fn list_experiences(
        &self,
        project: Uuid,
        filter: &ExperienceFilter,
    ) -> PlatformResult<Vec<Experience>> {
        self.begin().await?;
        let state = self.state.read().await;
        state.project(project)?;
        Ok(state
            .experiences
            .iter()
            .filter(|e| e.project_id == project && e.archived == filter.archived)
            .filter(|e| name_matches(&e.name, filter.name.as_deref()))
            .cloned()
            .collect())
    }

    async fn get_experience(&self, project: Uuid, id: Uuid) -> PlatformResult<Experience> {
        self.begin().await?;
        let state = self.state.read().await;
        state
            .experiences
            .iter()
            .find(|e| e.id == id && e.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("experience", id))
    }

    async fn create_experience(
        &self,
        project: Uuid,
        request: &NewExperience,
    ) -> PlatformResult<Experience> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        if state
            .experiences
            .iter()
            .any(|e| e.project_id == project && !e.archived && e.name == request.name)
        {
            return Err(conflict("experience", &request.name));
        }
        let experience = Experience {
            id: Uuid::new_v4(),
            project_id: project,
            name: request.name.clone(),
            description: request.description.clone(),
            locations: request.locations.clone(),
            container_timeout_seconds: request.container_timeout_seconds,
            profile: request.profile.clone(),
            environment_variables: request.environment_variables.clone(),
            system_ids: request.system_ids.clone(),
            tag_ids: Vec::new(),
            archived: false,
        };
        state.experiences.push(experience.clone());
        Ok(experience)
    }

    async fn update_experience(
        &self,
        project: Uuid,
        id: Uuid,
        request: &ExperienceUpdate,
    ) -> PlatformResult<Experience> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let experience = state
            .experiences
            .iter_mut()
            .find(|e| e.id == id && e.project_id == project)
            .ok_or_else(|| not_found("experience", id))?;
        if let Some(name) = &request.name {
            experience.name.clone_from(name);
        }
        if let Some(description) = &request.description {
            experience.description.clone_from(description);
        }
        if let Some(locations) = &request.locations {
            experience.locations.clone_from(locations);
        }
        if let Some(timeout) = request.container_timeout_seconds {
            experience.container_timeout_seconds = timeout;
        }
        if let Some(profile) = &request.profile {
            experience.profile = Some(profile.clone());
        }
        if let Some(variables) = &request.environment_variables {
            experience.environment_variables.clone_from(variables);
        }
        Ok(experience.clone())
    }

    async fn archive_experience(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let experience = state
            .experiences
            .iter_mut()
            .find(|e| e.id == id && e.project_id == project)
            .ok_or_else(|| not_found("experience", id))?;
        experience.archived = true;
        Ok(())
    }

    async fn restore_experience(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let name = state
            .experiences
            .iter()
            .find(|e| e.id == id && e.project_id == project)
            .map(|e| e.name.clone())
            .ok_or_else(|| not_found("experience", id))?;
        if state
            .experiences
            .iter()
            .any(|e| e.project_id == project && !e.archived && e.name == name && e.id != id)
        {
            return Err(conflict("experience", &name));
        }
        if let Some(experience) = state.experiences.iter_mut().find(|e| e.id == id) {
            experience.archived = false;
        }
        Ok(())
    }

    async fn add_system_to_experience(
        &self,
        project: Uuid,
        experience: Uuid,
        system: Uuid,
    ) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let entry = state
            .experiences
            .iter_mut()
            .find(|e| e.id == experience && e.project_id == project)
            .ok_or_else(|| not_found("experience", experience))?;
        if !entry.system_ids.contains(&system) {
            entry.system_ids.push(system);
        }
        Ok(())
    }

    async fn remove_system_from_experience(
        &self,
        project: Uuid,
        experience: Uuid,
        system: Uuid,
    ) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let entry = state
            .experiences
            .iter_mut()
            .find(|e| e.id == experience && e.project_id == project)
            .ok_or_else(|| not_found("experience", experience))?;
        entry.system_ids.retain(|s| *s != system);
        Ok(())
    }

    async fn list_experience_tags(
        &self,
        project: Uuid,
        name: Option<&str>,
    ) -> PlatformResult<Vec<ExperienceTag>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .tags
            .iter()
            .filter(|t| t.project_id == project && name_matches(&t.name, name))
            .cloned()
            .collect())
    }

    async fn get_experience_tag(&self, project: Uuid, id: Uuid) -> PlatformResult<ExperienceTag> {
        self.begin().await?;
        let state = self.state.read().await;
        state
            .tags
            .iter()
            .find(|t| t.id == id && t.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("experience tag", id))
    }

    async fn create_experience_tag(
        &self,
        project: Uuid,
        request: &NewExperienceTag,
    ) -> PlatformResult<ExperienceTag> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        if state
            .tags
            .iter()
            .any(|t| t.project_id == project && t.name == request.name)
        {
            return Err(conflict("experience tag", &request.name));
        }
        let tag = ExperienceTag {
            id: Uuid::new_v4(),
            project_id: project,
            name: request.name.clone(),
            description: request.description.clone(),
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn tag_experience(
        &self,
        project: Uuid,
        tag: Uuid,
        experience: Uuid,
    ) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        if !state.tags.iter().any(|t| t.id == tag && t.project_id == project) {
            return Err(not_found("experience tag", tag));
        }
        let entry = state
            .experiences
            .iter_mut()
            .find(|e| e.id == experience && e.project_id == project)
            .ok_or_else(|| not_found("experience", experience))?;
        if !entry.tag_ids.contains(&tag) {
            entry.tag_ids.push(tag);
        }
        Ok(())
    }

    async fn untag_experience(
        &self,
        project: Uuid,
        tag: Uuid,
        experience: Uuid,
    ) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let entry = state
            .experiences
            .iter_mut()
            .find(|e| e.id == experience && e.project_id == project)
            .ok_or_else(|| not_found("experience", experience))?;
        entry.tag_ids.retain(|t| *t != tag);
        Ok(())
    }

    async fn list_tagged_experiences(
        &self,
        project: Uuid,
        tag: Uuid,
    ) -> PlatformResult<Vec<Experience>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .experiences
            .iter()
            .filter(|e| e.project_id == project && !e.archived && e.tag_ids.contains(&tag))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BatchesApi for InMemoryPlatform {
    async fn create_batch(&self, project: Uuid, request: &NewBatch) -> PlatformResult<Batch> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        check_percent(request.allowable_failure_percent)?;
        state.check_build(project, request.build_id)?;
        state.check_metrics_build(project, request.metrics_build_id)?;
        let experiences =
            state.expand_experiences(project, &request.experience_ids, &request.experience_tag_ids)?;
        Ok(state.launch_batch(
            project,
            request.build_id,
            experiences,
            request.metrics_build_id,
            request.parameters.clone(),
            request.pool_labels.clone(),
            request.allowable_failure_percent,
            request.friendly_name.clone(),
        ))
    }

    async fn get_batch(&self, project: Uuid, id: Uuid) -> PlatformResult<Batch> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let mut batch = state
            .batches
            .iter()
            .find(|b| b.id == id && b.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("batch", id))?;
        batch.status = if state.cancelled.contains(&id) {
            WorkStatus::Cancelled
        } else {
            let step = state.batch_steps.get_mut(&id).map_or(Step::Settle, advance);
            match step {
                Step::Status(status) => status,
                Step::Settle => state.settle_batch(id),
            }
        };
        Ok(batch)
    }

    async fn list_batches(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Batch>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .batches
            .iter()
            .filter(|b| b.project_id == project && name_matches(&b.friendly_name, name))
            .map(|b| Batch {
                status: state.batch_status(b.id),
                ..b.clone()
            })
            .collect())
    }

    async fn list_jobs(&self, project: Uuid, batch: Uuid) -> PlatformResult<Vec<Job>> {
        self.begin().await?;
        let state = self.state.read().await;
        if !state
            .batches
            .iter()
            .any(|b| b.id == batch && b.project_id == project)
        {
            return Err(not_found("batch", batch));
        }
        Ok(state
            .jobs
            .get(&batch)
            .map(|jobs| {
                jobs.iter()
                    .map(|j| Job {
                        status: state.job_status(j),
                        ..j.clone()
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_job_logs(
        &self,
        _project: Uuid,
        batch: Uuid,
        job: Uuid,
    ) -> PlatformResult<Vec<JobLog>> {
        self.begin().await?;
        let state = self.state.read().await;
        if !state
            .jobs
            .get(&batch)
            .is_some_and(|jobs| jobs.iter().any(|j| j.id == job))
        {
            return Err(not_found("job", job));
        }
        Ok(state
            .logs
            .get(&job)
            .map(|logs| logs.iter().map(|(log, _)| log.clone()).collect())
            .unwrap_or_default())
    }

    async fn fetch_log(&self, log: &JobLog) -> PlatformResult<Vec<u8>> {
        self.begin().await?;
        let state = self.state.read().await;
        state
            .logs
            .values()
            .flatten()
            .find(|(candidate, _)| candidate.location == log.location)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| PlatformError::NotFound(format!("no log at {}", log.location)))
    }

    async fn cancel_batch(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        if !state
            .batches
            .iter()
            .any(|b| b.id == id && b.project_id == project)
        {
            return Err(not_found("batch", id));
        }
        if !state.cancelled.contains(&id) {
            state.cancelled.push(id);
        }
        Ok(())
    }

    async fn rerun_batch(&self, project: Uuid, id: Uuid, jobs: &[Uuid]) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        if !state
            .batches
            .iter()
            .any(|b| b.id == id && b.project_id == project)
        {
            return Err(not_found("batch", id));
        }
        let known: Vec<Uuid> = state
            .jobs
            .get(&id)
            .map(|list| list.iter().map(|j| j.id).collect())
            .unwrap_or_default();
        if let Some(unknown) = jobs.iter().find(|j| !known.contains(j)) {
            return Err(rejected(format!("job {unknown} is not part of batch {id}")));
        }
        for job in jobs {
            if let Some(script) = state.job_scripts.get_mut(job) {
                script.generation += 1;
            }
        }
        let mut steps: VecDeque<Step> = state
            .rerun_steps
            .get(&id)
            .cloned()
            .unwrap_or_else(|| vec![WorkStatus::Submitted, WorkStatus::ExperiencesRunning])
            .into_iter()
            .map(Step::Status)
            .collect();
        steps.push_back(Step::Settle);
        state.batch_steps.insert(id, steps);
        state.reruns.push((id, jobs.to_vec()));
        Ok(())
    }

    async fn create_sweep(&self, project: Uuid, request: &NewSweep) -> PlatformResult<Sweep> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        state.check_build(project, request.build_id)?;
        state.check_metrics_build(project, request.metrics_build_id)?;
        let grid = GridSearch::new(request.parameters.clone())
            .map_err(|e| rejected(e.to_string()))?;
        let experiences =
            state.expand_experiences(project, &request.experience_ids, &request.experience_tag_ids)?;
        let id = Uuid::new_v4();
        let mut batch_ids = Vec::new();
        for parameters in grid.combinations() {
            let batch = state.launch_batch(
                project,
                request.build_id,
                experiences.clone(),
                request.metrics_build_id,
                parameters,
                request.pool_labels.clone(),
                0,
                None,
            );
            if let Some(stored) = state.batches.iter_mut().find(|b| b.id == batch.id) {
                stored.sweep_id = Some(id);
            }
            batch_ids.push(batch.id);
        }
        let sweep = Sweep {
            id,
            project_id: project,
            name: request
                .name
                .clone()
                .unwrap_or_else(|| format!("sweep-{}", &id.to_string()[..8])),
            parameters: request.parameters.clone(),
            batch_ids,
            status: WorkStatus::Submitted,
            creation_timestamp: Some(Utc::now()),
        };
        state
            .sweep_steps
            .insert(id, default_steps(WorkStatus::BatchesRunning));
        state.sweeps.push(sweep.clone());
        Ok(sweep)
    }

    async fn get_sweep(&self, project: Uuid, id: Uuid) -> PlatformResult<Sweep> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let mut sweep = state
            .sweeps
            .iter()
            .find(|s| s.id == id && s.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("sweep", id))?;
        sweep.status = if state.cancelled.contains(&id) {
            WorkStatus::Cancelled
        } else {
            match state.sweep_steps.get_mut(&id).map_or(Step::Settle, advance) {
                Step::Status(status) => status,
                Step::Settle => state.settle_many(&sweep.batch_ids),
            }
        };
        Ok(sweep)
    }

    async fn list_sweeps(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Sweep>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .sweeps
            .iter()
            .filter(|s| s.project_id == project && name_matches(&s.name, name))
            .cloned()
            .collect())
    }

    async fn cancel_sweep(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let batch_ids = state
            .sweeps
            .iter()
            .find(|s| s.id == id && s.project_id == project)
            .map(|s| s.batch_ids.clone())
            .ok_or_else(|| not_found("sweep", id))?;
        state.cancelled.push(id);
        state.cancelled.extend(batch_ids);
        Ok(())
    }

    async fn create_debug_session(
        &self,
        project: Uuid,
        request: &NewDebugSession,
    ) -> PlatformResult<DebugSession> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        state.check_build(project, request.build_id)?;
        let experiences = state.expand_experiences(project, &[request.experience_id], &[])?;
        let batch = state.launch_batch(
            project,
            request.build_id,
            experiences,
            None,
            ParameterMap::new(),
            request.pool_labels.clone(),
            0,
            None,
        );
        state
            .batch_steps
            .insert(batch.id, VecDeque::from([Step::Status(WorkStatus::ExperiencesRunning)]));
        Ok(DebugSession {
            batch_id: batch.id,
            namespace: format!("debug-{}", &batch.id.to_string()[..8]),
            cluster_endpoint: "https://debug.cluster.local".to_string(),
            cluster_token: "debug-token".to_string(),
            cluster_ca_data: String::new(),
        })
    }
}

#[async_trait]
impl SuitesApi for InMemoryPlatform {
    async fn create_suite(&self, project: Uuid, request: &NewTestSuite) -> PlatformResult<TestSuite> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        if state.suite_order.iter().any(|id| {
            state
                .suites
                .get(id)
                .and_then(|revisions| revisions.last())
                .is_some_and(|s| s.project_id == project && !s.archived && s.name == request.name)
        }) {
            return Err(conflict("test suite", &request.name));
        }
        state.check_metrics_build(project, request.metrics_build_id)?;
        let suite = TestSuite {
            id: Uuid::new_v4(),
            project_id: project,
            name: request.name.clone(),
            description: request.description.clone(),
            revision: 0,
            system_id: request.system_id,
            experience_ids: request.experience_ids.clone(),
            metrics_build_id: request.metrics_build_id,
            show_on_summary: request.show_on_summary,
            metrics_set_name: request.metrics_set_name.clone().filter(|n| !n.is_empty()),
            archived: false,
        };
        state.suites.insert(suite.id, vec![suite.clone()]);
        state.suite_order.push(suite.id);
        Ok(suite)
    }

    async fn revise_suite(
        &self,
        project: Uuid,
        id: Uuid,
        request: &SuiteRevision,
    ) -> PlatformResult<TestSuite> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.check_metrics_build(project, request.metrics_build_id)?;
        let mut next = state.latest_suite(project, id)?.clone();
        next.revision += 1;
        if let Some(name) = &request.name {
            next.name.clone_from(name);
        }
        if let Some(description) = &request.description {
            next.description.clone_from(description);
        }
        if let Some(system) = request.system_id {
            next.system_id = system;
        }
        if let Some(experiences) = &request.experience_ids {
            next.experience_ids.clone_from(experiences);
        }
        if let Some(metrics_build) = request.metrics_build_id {
            next.metrics_build_id = Some(metrics_build);
        }
        if let Some(show) = request.show_on_summary {
            next.show_on_summary = show;
        }
        if let Some(set_name) = &request.metrics_set_name {
            next.metrics_set_name = Some(set_name.clone()).filter(|n| !n.is_empty());
        }
        if let Some(revisions) = state.suites.get_mut(&id) {
            revisions.push(next.clone());
        }
        Ok(next)
    }

    async fn get_suite(
        &self,
        project: Uuid,
        id: Uuid,
        revision: Option<u32>,
    ) -> PlatformResult<TestSuite> {
        self.begin().await?;
        let state = self.state.read().await;
        let latest = state.latest_suite(project, id)?;
        match revision {
            None => Ok(latest.clone()),
            Some(revision) => state
                .suites
                .get(&id)
                .and_then(|revisions| revisions.get(revision as usize))
                .cloned()
                .ok_or_else(|| {
                    PlatformError::NotFound(format!("test suite {id} has no revision {revision}"))
                }),
        }
    }

    async fn list_suites(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<TestSuite>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .suite_order
            .iter()
            .filter_map(|id| state.suites.get(id).and_then(|revisions| revisions.last()))
            .filter(|s| s.project_id == project && !s.archived && name_matches(&s.name, name))
            .cloned()
            .collect())
    }

    async fn list_suite_revisions(&self, project: Uuid, id: Uuid) -> PlatformResult<Vec<TestSuite>> {
        self.begin().await?;
        let state = self.state.read().await;
        state.latest_suite(project, id)?;
        Ok(state.suites.get(&id).cloned().unwrap_or_default())
    }

    async fn archive_suite(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.latest_suite(project, id)?;
        if let Some(revisions) = state.suites.get_mut(&id) {
            for revision in revisions {
                revision.archived = true;
            }
        }
        Ok(())
    }

    async fn restore_suite(&self, project: Uuid, id: Uuid) -> PlatformResult<()> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.latest_suite(project, id)?;
        if let Some(revisions) = state.suites.get_mut(&id) {
            for revision in revisions {
                revision.archived = false;
            }
        }
        Ok(())
    }

    async fn run_suite(
        &self,
        project: Uuid,
        id: Uuid,
        revision: Option<u32>,
        request: &SuiteRun,
    ) -> PlatformResult<Batch> {
        self.begin().await?;
        let mut state = self.state.write().await;
        check_percent(request.allowable_failure_percent)?;
        state.check_build(project, request.build_id)?;
        let latest = state.latest_suite(project, id)?.clone();
        let suite = match revision {
            None => latest,
            Some(revision) => state
                .suites
                .get(&id)
                .and_then(|revisions| revisions.get(revision as usize))
                .cloned()
                .ok_or_else(|| {
                    PlatformError::NotFound(format!("test suite {id} has no revision {revision}"))
                })?,
        };
        let experiences = state.expand_experiences(project, &suite.experience_ids, &[])?;
        let batch = state.launch_batch(
            project,
            request.build_id,
            experiences,
            suite.metrics_build_id,
            request.parameters.clone(),
            request.pool_labels.clone(),
            request.allowable_failure_percent,
            request.batch_name.clone(),
        );
        let stored = state
            .batches
            .iter_mut()
            .find(|b| b.id == batch.id)
            .ok_or_else(|| not_found("batch", batch.id))?;
        stored.test_suite_id = Some(suite.id);
        stored.test_suite_revision = Some(suite.revision);
        Ok(stored.clone())
    }

    async fn list_suite_batches(
        &self,
        project: Uuid,
        id: Uuid,
        revision: Option<u32>,
    ) -> PlatformResult<Vec<Batch>> {
        self.begin().await?;
        let state = self.state.read().await;
        state.latest_suite(project, id)?;
        Ok(state
            .batches
            .iter()
            .filter(|b| b.test_suite_id == Some(id))
            .filter(|b| revision.is_none() || b.test_suite_revision == revision)
            .map(|b| Batch {
                status: state.batch_status(b.id),
                ..b.clone()
            })
            .collect())
    }

    async fn create_report(&self, project: Uuid, request: &NewReport) -> PlatformResult<Report> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.latest_suite(project, request.test_suite_id)?;
        state.check_metrics_build(project, Some(request.metrics_build_id))?;
        if !state
            .branches
            .iter()
            .any(|b| b.id == request.branch_id && b.project_id == project)
        {
            return Err(rejected(format!("branch {} does not exist", request.branch_id)));
        }
        let report = Report {
            id: Uuid::new_v4(),
            project_id: project,
            name: request.name.clone(),
            test_suite_id: request.test_suite_id,
            test_suite_revision: request.test_suite_revision,
            branch_id: request.branch_id,
            metrics_build_id: request.metrics_build_id,
            start_timestamp: request.start_timestamp,
            end_timestamp: request.end_timestamp,
            respect_revision_boundary: request.respect_revision_boundary,
            status: WorkStatus::Submitted,
        };
        state
            .report_steps
            .insert(report.id, default_steps(WorkStatus::Running));
        state.reports.push(report.clone());
        Ok(report)
    }

    async fn get_report(&self, project: Uuid, id: Uuid) -> PlatformResult<Report> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let mut report = state
            .reports
            .iter()
            .find(|r| r.id == id && r.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("report", id))?;
        report.status = match state.report_steps.get_mut(&id).map_or(Step::Settle, advance) {
            Step::Status(status) => status,
            Step::Settle => WorkStatus::Succeeded,
        };
        Ok(report)
    }

    async fn list_reports(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Report>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .reports
            .iter()
            .filter(|r| r.project_id == project && name_matches(&r.name, name))
            .cloned()
            .collect())
    }

    async fn list_report_logs(&self, project: Uuid, id: Uuid) -> PlatformResult<Vec<JobLog>> {
        self.begin().await?;
        let state = self.state.read().await;
        if !state
            .reports
            .iter()
            .any(|r| r.id == id && r.project_id == project)
        {
            return Err(not_found("report", id));
        }
        Ok(state
            .logs
            .get(&id)
            .map(|logs| logs.iter().map(|(log, _)| log.clone()).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl WorkflowsApi for InMemoryPlatform {
    async fn create_workflow(&self, project: Uuid, request: &NewWorkflow) -> PlatformResult<Workflow> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        if state
            .workflows
            .iter()
            .any(|w| w.project_id == project && !w.archived && w.name == request.name)
        {
            return Err(conflict("workflow", &request.name));
        }
        for entry in &request.suites {
            state.latest_suite(project, entry.test_suite_id)?;
        }
        let workflow = Workflow {
            id: Uuid::new_v4(),
            project_id: project,
            name: request.name.clone(),
            description: request.description.clone(),
            ci_workflow_link: request.ci_workflow_link.clone(),
            suites: request
                .suites
                .iter()
                .map(|s| WorkflowSuite {
                    test_suite_id: s.test_suite_id,
                    enabled: s.enabled,
                })
                .collect(),
            archived: false,
        };
        state.workflows.push(workflow.clone());
        Ok(workflow)
    }

    async fn update_workflow(
        &self,
        project: Uuid,
        id: Uuid,
        request: &WorkflowUpdate,
    ) -> PlatformResult<Workflow> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let workflow = state
            .workflows
            .iter_mut()
            .find(|w| w.id == id && w.project_id == project)
            .ok_or_else(|| not_found("workflow", id))?;
        if let Some(name) = &request.name {
            workflow.name.clone_from(name);
        }
        if let Some(description) = &request.description {
            workflow.description.clone_from(description);
        }
        if let Some(link) = &request.ci_workflow_link {
            workflow.ci_workflow_link = Some(link.clone());
        }
        if let Some(suites) = &request.suites {
            workflow.suites = suites
                .iter()
                .map(|s| WorkflowSuite {
                    test_suite_id: s.test_suite_id,
                    enabled: s.enabled,
                })
                .collect();
        }
        Ok(workflow.clone())
    }

    async fn get_workflow(&self, project: Uuid, id: Uuid) -> PlatformResult<Workflow> {
        self.begin().await?;
        let state = self.state.read().await;
        state
            .workflows
            .iter()
            .find(|w| w.id == id && w.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("workflow", id))
    }

    async fn list_workflows(&self, project: Uuid, name: Option<&str>) -> PlatformResult<Vec<Workflow>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .workflows
            .iter()
            .filter(|w| w.project_id == project && !w.archived && name_matches(&w.name, name))
            .cloned()
            .collect())
    }

    async fn create_workflow_run(
        &self,
        project: Uuid,
        workflow: Uuid,
        request: &NewWorkflowRun,
    ) -> PlatformResult<WorkflowRun> {
        self.begin().await?;
        let mut state = self.state.write().await;
        check_percent(request.allowable_failure_percent)?;
        state.check_build(project, request.build_id)?;
        let definition = state
            .workflows
            .iter()
            .find(|w| w.id == workflow && w.project_id == project)
            .cloned()
            .ok_or_else(|| not_found("workflow", workflow))?;
        let mut suites = Vec::new();
        for entry in definition.suites.iter().filter(|s| s.enabled) {
            let suite = state.latest_suite(project, entry.test_suite_id)?.clone();
            let experiences = state.expand_experiences(project, &suite.experience_ids, &[])?;
            let batch = state.launch_batch(
                project,
                request.build_id,
                experiences,
                suite.metrics_build_id,
                request.parameters.clone(),
                request.pool_labels.clone(),
                request.allowable_failure_percent,
                None,
            );
            suites.push(WorkflowRunSuite {
                test_suite_id: suite.id,
                test_suite_revision: suite.revision,
                batch_id: batch.id,
            });
        }
        let run = WorkflowRun {
            id: Uuid::new_v4(),
            workflow_id: workflow,
            build_id: request.build_id,
            parameters: request.parameters.clone(),
            pool_labels: request.pool_labels.clone(),
            allowable_failure_percent: request.allowable_failure_percent,
            suites,
            status: WorkStatus::Submitted,
        };
        state
            .run_steps
            .insert(run.id, default_steps(WorkStatus::Running));
        state.workflow_runs.push(run.clone());
        Ok(run)
    }

    async fn list_workflow_runs(
        &self,
        _project: Uuid,
        workflow: Uuid,
    ) -> PlatformResult<Vec<WorkflowRun>> {
        self.begin().await?;
        let state = self.state.read().await;
        Ok(state
            .workflow_runs
            .iter()
            .filter(|r| r.workflow_id == workflow)
            .cloned()
            .collect())
    }

    async fn get_workflow_run(
        &self,
        _project: Uuid,
        workflow: Uuid,
        run: Uuid,
    ) -> PlatformResult<WorkflowRun> {
        self.begin().await?;
        let mut state = self.state.write().await;
        let mut found = state
            .workflow_runs
            .iter()
            .find(|r| r.id == run && r.workflow_id == workflow)
            .cloned()
            .ok_or_else(|| not_found("workflow run", run))?;
        found.status = match state.run_steps.get_mut(&run).map_or(Step::Settle, advance) {
            Step::Status(status) => status,
            Step::Settle => {
                let batches: Vec<Uuid> = found.suites.iter().map(|s| s.batch_id).collect();
                state.settle_many(&batches)
            }
        };
        Ok(found)
    }
}

#[async_trait]
impl MetricsConfigApi for InMemoryPlatform {
    async fn sync_metrics_config(
        &self,
        project: Uuid,
        request: &MetricsConfigUpdate,
    ) -> PlatformResult<Vec<TemplateUpload>> {
        self.begin().await?;
        let mut state = self.state.write().await;
        state.project(project)?;
        state.metrics_configs.push((project, request.clone()));
        Ok(request
            .template_names
            .iter()
            .map(|name| TemplateUpload {
                name: name.clone(),
                upload_url: format!("memory://templates/{name}"),
            })
            .collect())
    }

    async fn upload_template(&self, upload: &TemplateUpload, content: Vec<u8>) -> PlatformResult<()> {
        self.begin().await?;
        self.state
            .write()
            .await
            .uploads
            .insert(upload.name.clone(), content);
        Ok(())
    }
}
