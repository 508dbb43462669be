//! Polling state machine over long-running work items.
//!
//! A work item is anything the platform advances on its own: batches,
//! sweeps, reports and workflow runs. The observer reads its status once per
//! tick until the status reaches the stop set, the caller's deadline passes,
//! or a shutdown signal arrives.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{EntityKind, PollConfig, WorkStatus};
use crate::domain::ports::{Platform, PlatformResult};

/// Shortest allowed pause between status reads.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Remote work the observer can follow.
#[async_trait]
pub trait WorkItem: Send + Sync {
    /// Entity kind, for log fields and error messages.
    fn kind(&self) -> EntityKind;

    /// Platform ID of the item.
    fn id(&self) -> Uuid;

    /// One status read, without retries.
    async fn fetch_status(&self, platform: &dyn Platform) -> PlatformResult<WorkStatus>;

    /// Ask the platform to stop the item. Unsupported by default.
    async fn cancel(&self, _platform: &dyn Platform) -> DomainResult<()> {
        Err(DomainError::Unsupported {
            kind: self.kind(),
            operation: "cancel",
        })
    }

    /// Restart the given jobs. Only batches support this.
    async fn rerun(&self, _platform: &dyn Platform, _jobs: &[Uuid]) -> DomainResult<()> {
        Err(DomainError::Unsupported {
            kind: self.kind(),
            operation: "rerun",
        })
    }
}

/// A test batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchItem {
    /// Owning project.
    pub project: Uuid,
    /// Batch ID.
    pub id: Uuid,
}

#[async_trait]
impl WorkItem for BatchItem {
    fn kind(&self) -> EntityKind {
        EntityKind::Batch
    }

    fn id(&self) -> Uuid {
        self.id
    }

    async fn fetch_status(&self, platform: &dyn Platform) -> PlatformResult<WorkStatus> {
        Ok(platform.get_batch(self.project, self.id).await?.status)
    }

    async fn cancel(&self, platform: &dyn Platform) -> DomainResult<()> {
        platform
            .cancel_batch(self.project, self.id)
            .await
            .map_err(DomainError::remote("cancel", EntityKind::Batch))
    }

    async fn rerun(&self, platform: &dyn Platform, jobs: &[Uuid]) -> DomainResult<()> {
        platform
            .rerun_batch(self.project, self.id, jobs)
            .await
            .map_err(DomainError::remote("rerun", EntityKind::Batch))
    }
}

/// A parameter sweep. Its status summarises the batches it launched.
#[derive(Debug, Clone, Copy)]
pub struct SweepItem {
    /// Owning project.
    pub project: Uuid,
    /// Sweep ID.
    pub id: Uuid,
}

#[async_trait]
impl WorkItem for SweepItem {
    fn kind(&self) -> EntityKind {
        EntityKind::Sweep
    }

    fn id(&self) -> Uuid {
        self.id
    }

    async fn fetch_status(&self, platform: &dyn Platform) -> PlatformResult<WorkStatus> {
        Ok(platform.get_sweep(self.project, self.id).await?.status)
    }

    async fn cancel(&self, platform: &dyn Platform) -> DomainResult<()> {
        platform
            .cancel_sweep(self.project, self.id)
            .await
            .map_err(DomainError::remote("cancel", EntityKind::Sweep))
    }
}

/// A metrics report. Reports cannot be cancelled.
#[derive(Debug, Clone, Copy)]
pub struct ReportItem {
    /// Owning project.
    pub project: Uuid,
    /// Report ID.
    pub id: Uuid,
}

#[async_trait]
impl WorkItem for ReportItem {
    fn kind(&self) -> EntityKind {
        EntityKind::Report
    }

    fn id(&self) -> Uuid {
        self.id
    }

    async fn fetch_status(&self, platform: &dyn Platform) -> PlatformResult<WorkStatus> {
        Ok(platform.get_report(self.project, self.id).await?.status)
    }
}

/// One run of a workflow.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowRunItem {
    /// Owning project.
    pub project: Uuid,
    /// Workflow the run belongs to.
    pub workflow: Uuid,
    /// Run ID.
    pub run: Uuid,
}

#[async_trait]
impl WorkItem for WorkflowRunItem {
    fn kind(&self) -> EntityKind {
        EntityKind::WorkflowRun
    }

    fn id(&self) -> Uuid {
        self.run
    }

    async fn fetch_status(&self, platform: &dyn Platform) -> PlatformResult<WorkStatus> {
        Ok(platform
            .get_workflow_run(self.project, self.workflow, self.run)
            .await?
            .status)
    }

    /// Cancels every batch the run launched.
    async fn cancel(&self, platform: &dyn Platform) -> DomainResult<()> {
        let run = platform
            .get_workflow_run(self.project, self.workflow, self.run)
            .await
            .map_err(DomainError::remote("get", EntityKind::WorkflowRun))?;
        for suite in &run.suites {
            platform
                .cancel_batch(self.project, suite.batch_id)
                .await
                .map_err(DomainError::remote("cancel", EntityKind::Batch))?;
        }
        Ok(())
    }
}

/// Polling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Pause between status reads. Never below [`MIN_POLL_INTERVAL`].
    pub interval: Duration,
    /// Terminal reads to skip right after a restart.
    pub restart_grace_polls: u32,
    /// Transient read failures tolerated in a row before giving up.
    pub max_consecutive_errors: u32,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self::from(&PollConfig::default())
    }
}

impl From<&PollConfig> for ObserverConfig {
    fn from(config: &PollConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs).max(MIN_POLL_INTERVAL),
            restart_grace_polls: config.restart_grace_polls,
            max_consecutive_errors: config.max_consecutive_errors,
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct ObserveOptions {
    /// Give up after this long without reaching the stop set.
    pub deadline: Option<Duration>,
    /// Extra non-terminal statuses that also end the wait.
    pub until: Vec<WorkStatus>,
    /// The item was just restarted, so the first terminal reads may be stale.
    pub await_restart: bool,
}

/// Result of one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The status that ended the wait.
    pub status: WorkStatus,
    /// Status reads issued, including failed and skipped ones.
    pub polls: u32,
    /// Every status read that belongs to this attempt, in order.
    pub history: Vec<WorkStatus>,
}

type StatusCallback<'a> = Box<dyn Fn(EntityKind, Uuid, WorkStatus) + Send + Sync + 'a>;

/// Follows work items on one platform.
pub struct Observer<'a> {
    platform: &'a dyn Platform,
    config: ObserverConfig,
    shutdown: Option<broadcast::Sender<()>>,
    on_status: Option<StatusCallback<'a>>,
}

impl<'a> Observer<'a> {
    /// Observer with `config`, raising a too-short interval to the minimum.
    pub fn new(platform: &'a dyn Platform, config: ObserverConfig) -> Self {
        Self {
            platform,
            config: ObserverConfig {
                interval: config.interval.max(MIN_POLL_INTERVAL),
                ..config
            },
            shutdown: None,
            on_status: None,
        }
    }

    /// Stop waiting, and cancel the item, when `shutdown` fires.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: broadcast::Sender<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Called whenever the observed status changes.
    #[must_use]
    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(EntityKind, Uuid, WorkStatus) + Send + Sync + 'a,
    {
        self.on_status = Some(Box::new(callback));
        self
    }

    /// The platform being polled.
    pub const fn platform(&self) -> &'a dyn Platform {
        self.platform
    }

    /// Effective polling settings.
    pub const fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// Read the status once.
    pub async fn status(&self, item: &dyn WorkItem) -> DomainResult<WorkStatus> {
        item.fetch_status(self.platform)
            .await
            .map_err(DomainError::remote("get", item.kind()))
    }

    /// Poll until the item reaches a terminal status or one of
    /// `options.until`.
    pub async fn observe(
        &self,
        item: &dyn WorkItem,
        options: &ObserveOptions,
    ) -> DomainResult<Observation> {
        let started = Instant::now();
        let deadline = options.deadline.map(|d| started + d);
        let mut shutdown = self.shutdown.as_ref().map(broadcast::Sender::subscribe);
        let mut grace = if options.await_restart {
            self.config.restart_grace_polls
        } else {
            0
        };
        let mut consecutive_errors = 0;
        let mut polls = 0;
        let mut history: Vec<WorkStatus> = Vec::new();

        loop {
            let fetched = tokio::select! {
                result = item.fetch_status(self.platform) => result,
                () = shutdown_signal(&mut shutdown) => return Err(self.interrupt(item).await),
            };
            polls += 1;

            match fetched {
                Ok(status) => {
                    consecutive_errors = 0;
                    if grace > 0 && status.is_terminal() {
                        grace -= 1;
                        debug!(kind = %item.kind(), id = %item.id(), %status, "ignoring terminal status from before the restart");
                    } else {
                        grace = 0;
                        if history.last() != Some(&status) {
                            info!(kind = %item.kind(), id = %item.id(), %status, "status changed");
                            if let Some(callback) = &self.on_status {
                                callback(item.kind(), item.id(), status);
                            }
                        }
                        history.push(status);
                        if status.is_terminal() || options.until.contains(&status) {
                            return Ok(Observation {
                                status,
                                polls,
                                history,
                            });
                        }
                    }
                }
                Err(cause) if cause.is_transient() && consecutive_errors < self.config.max_consecutive_errors => {
                    consecutive_errors += 1;
                    warn!(kind = %item.kind(), id = %item.id(), error = %cause, attempt = consecutive_errors, "status read failed, will retry");
                }
                Err(cause) => return Err(DomainError::remote("get", item.kind())(cause)),
            }

            let mut pause = self.config.interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(DomainError::Timeout {
                        kind: item.kind(),
                        id: item.id(),
                        status: history.last().copied().unwrap_or(WorkStatus::Unknown),
                        waited: now - started,
                    });
                }
                pause = pause.min(deadline - now);
            }
            debug!(kind = %item.kind(), id = %item.id(), pause = ?pause, "waiting before next status read");
            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                () = shutdown_signal(&mut shutdown) => return Err(self.interrupt(item).await),
            }
        }
    }

    async fn interrupt(&self, item: &dyn WorkItem) -> DomainError {
        warn!(kind = %item.kind(), id = %item.id(), "interrupted, cancelling");
        match item.cancel(self.platform).await {
            Ok(()) => info!(kind = %item.kind(), id = %item.id(), "cancel requested"),
            Err(err) => warn!(kind = %item.kind(), id = %item.id(), error = %err, "best-effort cancel failed"),
        }
        DomainError::Interrupted {
            kind: item.kind(),
            id: item.id(),
        }
    }
}

/// Resolves when a shutdown is broadcast. Never resolves without a channel
/// or once every sender is gone.
async fn shutdown_signal(receiver: &mut Option<broadcast::Receiver<()>>) {
    match receiver {
        Some(rx) => match rx.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => {
                *receiver = None;
                std::future::pending::<()>().await;
            }
        },
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlatform;
    use crate::domain::models::requests::{
        NewBatch, NewBranch, NewBuild, NewExperience, NewProject, NewSystem,
    };
    use crate::domain::models::{BranchType, ParameterMap, ResourceRequirements};
    use crate::domain::ports::{BatchesApi, BuildsApi, ExperiencesApi, PlatformError, ProjectsApi};

    async fn batch_fixture() -> (InMemoryPlatform, BatchItem) {
        let platform = InMemoryPlatform::new();
        let project = platform
            .create_project(&NewProject {
                name: "P1".into(),
                description: "d".into(),
            })
            .await
            .unwrap()
            .id;
        let system = platform
            .create_system(
                project,
                &NewSystem {
                    name: "S1".into(),
                    description: "d".into(),
                    build_resources: ResourceRequirements::default(),
                    metrics_build_resources: ResourceRequirements::default(),
                    architecture: Default::default(),
                },
            )
            .await
            .unwrap()
            .id;
        let branch = platform
            .create_branch(
                project,
                &NewBranch {
                    name: "main".into(),
                    branch_type: BranchType::Main,
                },
            )
            .await
            .unwrap()
            .id;
        let build = platform
            .create_build(
                project,
                &NewBuild {
                    branch_id: branch,
                    system_id: system,
                    name: "b".into(),
                    description: "d".into(),
                    version: "1".into(),
                    image_uri: Some("repo/x:1".into()),
                    build_specification: None,
                },
            )
            .await
            .unwrap()
            .id;
        let experience = platform
            .create_experience(
                project,
                &NewExperience {
                    name: "E1".into(),
                    description: "d".into(),
                    locations: vec!["s3://b/e1".into()],
                    container_timeout_seconds: 60,
                    profile: None,
                    environment_variables: vec![],
                    system_ids: vec![],
                },
            )
            .await
            .unwrap()
            .id;
        let batch = platform
            .create_batch(
                project,
                &NewBatch {
                    build_id: build,
                    experience_ids: vec![experience],
                    experience_tag_ids: vec![],
                    metrics_build_id: None,
                    parameters: ParameterMap::new(),
                    pool_labels: vec![],
                    allowable_failure_percent: 0,
                    friendly_name: None,
                    account: None,
                },
            )
            .await
            .unwrap();
        (platform, BatchItem { project, id: batch.id })
    }

    fn config() -> ObserverConfig {
        ObserverConfig {
            interval: Duration::from_secs(10),
            restart_grace_polls: 3,
            max_consecutive_errors: 2,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_until_terminal() {
        let (platform, item) = batch_fixture().await;
        let observer = Observer::new(&platform, config());
        let observation = observer
            .observe(&item, &ObserveOptions::default())
            .await
            .unwrap();
        assert_eq!(observation.status, WorkStatus::Succeeded);
        assert_eq!(
            observation.history,
            vec![
                WorkStatus::Submitted,
                WorkStatus::ExperiencesRunning,
                WorkStatus::Succeeded
            ]
        );
        assert_eq!(observation.polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_produces_timeout() {
        let (platform, item) = batch_fixture().await;
        platform
            .script_batch(item.id, vec![WorkStatus::ExperiencesRunning])
            .await;
        let observer = Observer::new(&platform, config());
        let options = ObserveOptions {
            deadline: Some(Duration::from_secs(25)),
            ..Default::default()
        };
        let err = observer.observe(&item, &options).await.unwrap_err();
        match err {
            DomainError::Timeout { status, waited, .. } => {
                assert_eq!(status, WorkStatus::ExperiencesRunning);
                assert_eq!(waited, Duration::from_secs(25));
            }
            other => panic!("expected timeout, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_stops_early() {
        let (platform, item) = batch_fixture().await;
        let observer = Observer::new(&platform, config());
        let options = ObserveOptions {
            until: vec![WorkStatus::ExperiencesRunning],
            ..Default::default()
        };
        let observation = observer.observe(&item, &options).await.unwrap();
        assert_eq!(observation.status, WorkStatus::ExperiencesRunning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_tolerated() {
        let (platform, item) = batch_fixture().await;
        platform.fail_next(PlatformError::Timeout).await;
        platform.fail_next(PlatformError::Network("reset".into())).await;
        let observer = Observer::new(&platform, config());
        let observation = observer
            .observe(&item, &ObserveOptions::default())
            .await
            .unwrap();
        assert_eq!(observation.status, WorkStatus::Succeeded);
        assert_eq!(observation.polls, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_stops() {
        let (platform, item) = batch_fixture().await;
        platform
            .fail_next(PlatformError::Rejected {
                status: 400,
                body: "bad batch".into(),
            })
            .await;
        let observer = Observer::new(&platform, config());
        let err = observer
            .observe(&item, &ObserveOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to get batch: bad batch");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_terminal_ignored_after_restart() {
        let (platform, item) = batch_fixture().await;
        platform
            .script_batch(
                item.id,
                vec![
                    WorkStatus::Error,
                    WorkStatus::Submitted,
                    WorkStatus::Succeeded,
                ],
            )
            .await;
        let observer = Observer::new(&platform, config());
        let options = ObserveOptions {
            await_restart: true,
            ..Default::default()
        };
        let observation = observer.observe(&item, &options).await.unwrap();
        assert_eq!(observation.status, WorkStatus::Succeeded);
        assert_eq!(
            observation.history,
            vec![WorkStatus::Submitted, WorkStatus::Succeeded]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_runs_out() {
        let (platform, item) = batch_fixture().await;
        platform.script_batch(item.id, vec![WorkStatus::Failed]).await;
        let observer = Observer::new(&platform, config());
        let options = ObserveOptions {
            await_restart: true,
            ..Default::default()
        };
        let observation = observer.observe(&item, &options).await.unwrap();
        assert_eq!(observation.status, WorkStatus::Failed);
        assert_eq!(observation.polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_item() {
        let (platform, item) = batch_fixture().await;
        platform
            .script_batch(item.id, vec![WorkStatus::ExperiencesRunning])
            .await;
        let (tx, _rx) = broadcast::channel(1);
        let observer = Observer::new(&platform, config()).with_shutdown(tx.clone());
        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            let _ = tx.send(());
        });
        let err = observer
            .observe(&item, &ObserveOptions::default())
            .await
            .unwrap_err();
        trigger.await.unwrap();
        assert!(matches!(err, DomainError::Interrupted { .. }));
        assert_eq!(platform.cancelled().await, vec![item.id]);
    }

    #[test]
    fn test_interval_floor() {
        let config = ObserverConfig::from(&PollConfig {
            interval_secs: 0,
            ..Default::default()
        });
        assert_eq!(config.interval, MIN_POLL_INTERVAL);
    }
}
