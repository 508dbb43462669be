//! Policy-driven rerun loop for batches.
//!
//! The supervisor waits for a batch to settle, collects jobs whose final
//! status is in the rerun set, and asks the platform to rerun exactly those
//! jobs under the same batch ID. It stops when nothing needs a rerun, the
//! attempt cap is reached, or the rerun set exceeds the failure budget.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, ValidationError};
use crate::domain::models::{EntityKind, JobStatus, WorkStatus};
use crate::services::observer::{BatchItem, ObserveOptions, Observer, WorkItem};
use crate::services::validation::{allowable_failure_percent, at_least, exclusive};

/// How many jobs may be rerun in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureBudget {
    /// Percent of all jobs in the batch.
    Percent(u8),
    /// Absolute number of jobs.
    MaxFailedJobs(usize),
}

impl Default for FailureBudget {
    fn default() -> Self {
        Self::Percent(100)
    }
}

impl FailureBudget {
    /// Build from the two mutually exclusive flags.
    pub fn from_flags(
        percent: Option<i64>,
        max_failed_jobs: Option<i64>,
    ) -> Result<Self, ValidationError> {
        exclusive(&[
            ("rerun-max-failure-percent", percent.is_some()),
            ("max-failed-job-threshold", max_failed_jobs.is_some()),
        ])?;
        match (percent, max_failed_jobs) {
            (Some(percent), None) => Ok(Self::Percent(allowable_failure_percent(percent)?)),
            (None, Some(count)) => {
                at_least("max failed job threshold", 1, count)?;
                let count = usize::try_from(count)
                    .map_err(|e| ValidationError::parse("max failed job threshold", count.to_string(), e))?;
                Ok(Self::MaxFailedJobs(count))
            }
            _ => Ok(Self::default()),
        }
    }

    /// Whether rerunning `rerun` of `total` jobs is over budget.
    pub fn exceeded(self, rerun: usize, total: usize) -> bool {
        match self {
            Self::MaxFailedJobs(max) => rerun > max,
            Self::Percent(percent) => {
                if total == 0 {
                    return false;
                }
                rerun * 100 > usize::from(percent) * total
            }
        }
    }
}

impl fmt::Display for FailureBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(percent) => write!(f, "{percent}% of jobs"),
            Self::MaxFailedJobs(count) => write!(f, "{count} jobs"),
        }
    }
}

/// When and how much to rerun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisePolicy {
    /// Rerun requests allowed before giving up.
    pub max_rerun_attempts: u32,
    /// Final job statuses that trigger a rerun.
    pub rerun_on: BTreeSet<JobStatus>,
    /// Largest rerun set allowed in one pass.
    pub budget: FailureBudget,
    /// Deadline for each wait, not for the whole supervision.
    pub wait_timeout: Option<Duration>,
}

impl Default for SupervisePolicy {
    fn default() -> Self {
        Self {
            max_rerun_attempts: 1,
            rerun_on: BTreeSet::from([JobStatus::Error]),
            budget: FailureBudget::default(),
            wait_timeout: None,
        }
    }
}

impl SupervisePolicy {
    /// Require a non-empty set of final statuses to rerun on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rerun_on.is_empty() {
            return Err(ValidationError::empty("rerun-on-states"));
        }
        if let Some(status) = self.rerun_on.iter().find(|s| !s.is_terminal()) {
            return Err(ValidationError::invalid(
                "rerun-on-states (only final job statuses may trigger a rerun)",
                status.as_str(),
            ));
        }
        Ok(())
    }
}

/// Why supervision ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No job finished in a rerun status.
    Converged,
    /// Jobs still needed a rerun but the attempt cap was reached.
    AttemptsExhausted,
    /// The rerun set was larger than the failure budget allows.
    BudgetExceeded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Converged => "converged",
            Self::AttemptsExhausted => "rerun attempts exhausted",
            Self::BudgetExceeded => "rerun set exceeds the failure budget",
        })
    }
}

/// Outcome of [`supervise`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperviseReport {
    #[serde(rename = "batchID")]
    pub batch_id: Uuid,
    /// Batch status after the last wait.
    pub final_status: WorkStatus,
    /// Rerun requests issued.
    pub attempts: u32,
    /// Job IDs of each rerun request, in order.
    pub reruns: Vec<Vec<Uuid>>,
    pub reason: StopReason,
}

/// Wait for `batch`, then rerun failing jobs per `policy` until it converges
/// or a limit is hit. A wait timeout ends supervision with an error.
pub async fn supervise(
    observer: &Observer<'_>,
    batch: BatchItem,
    policy: &SupervisePolicy,
) -> DomainResult<SuperviseReport> {
    policy.validate()?;
    let platform = observer.platform();
    let mut attempts = 0;
    let mut reruns = Vec::new();
    let mut options = ObserveOptions {
        deadline: policy.wait_timeout,
        ..Default::default()
    };

    loop {
        let observation = observer.observe(&batch, &options).await?;
        let jobs = platform
            .list_jobs(batch.project, batch.id)
            .await
            .map_err(DomainError::remote("list jobs for", EntityKind::Batch))?;
        let rerun_set: Vec<Uuid> = jobs
            .iter()
            .filter(|job| policy.rerun_on.contains(&job.status))
            .map(|job| job.id)
            .collect();

        let finish = |reason: StopReason, reruns: Vec<Vec<Uuid>>| {
            info!(batch = %batch.id, status = %observation.status, attempts, %reason, "supervision finished");
            SuperviseReport {
                batch_id: batch.id,
                final_status: observation.status,
                attempts,
                reruns,
                reason,
            }
        };

        if rerun_set.is_empty() {
            return Ok(finish(StopReason::Converged, reruns));
        }
        if attempts >= policy.max_rerun_attempts {
            return Ok(finish(StopReason::AttemptsExhausted, reruns));
        }
        if policy.budget.exceeded(rerun_set.len(), jobs.len()) {
            warn!(
                batch = %batch.id,
                rerun = rerun_set.len(),
                total = jobs.len(),
                budget = %policy.budget,
                "too many jobs to rerun"
            );
            return Ok(finish(StopReason::BudgetExceeded, reruns));
        }

        attempts += 1;
        info!(batch = %batch.id, attempt = attempts, jobs = rerun_set.len(), "rerunning jobs");
        batch.rerun(platform, &rerun_set).await?;
        reruns.push(rerun_set);
        options.await_restart = true;
    }
}
