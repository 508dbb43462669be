//! Lifecycle statuses reported by the platform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status shared by every long-running work item (batch, sweep, report,
/// workflow run). Items advance from submission through one or more running
/// phases to exactly one terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    Submitted,
    ExperiencesRunning,
    BatchMetricsQueued,
    BatchMetricsRunning,
    BatchesRunning,
    Running,
    Succeeded,
    Failed,
    Error,
    Cancelled,
    /// Any status this client does not know about. Treated as non-terminal.
    #[serde(other)]
    Unknown,
}

impl WorkStatus {
    /// Terminal statuses never change again within one attempt.
    pub const TERMINAL: [Self; 4] = [Self::Succeeded, Self::Failed, Self::Error, Self::Cancelled];

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Error | Self::Cancelled
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::ExperiencesRunning => "EXPERIENCES_RUNNING",
            Self::BatchMetricsQueued => "BATCH_METRICS_QUEUED",
            Self::BatchMetricsRunning => "BATCH_METRICS_RUNNING",
            Self::BatchesRunning => "BATCHES_RUNNING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        match normalized.as_str() {
            "SUBMITTED" => Ok(Self::Submitted),
            "EXPERIENCES_RUNNING" => Ok(Self::ExperiencesRunning),
            "BATCH_METRICS_QUEUED" => Ok(Self::BatchMetricsQueued),
            "BATCH_METRICS_RUNNING" => Ok(Self::BatchMetricsRunning),
            "BATCHES_RUNNING" => Ok(Self::BatchesRunning),
            "RUNNING" => Ok(Self::Running),
            "SUCCEEDED" => Ok(Self::Succeeded),
            "FAILED" => Ok(Self::Failed),
            "ERROR" => Ok(Self::Error),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            _ => Err(format!("unknown status: {s}")),
        }
    }
}

/// Per-job status combining execution outcome with metrics verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Passed,
    Failed,
    Error,
    Warning,
    Blocker,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Passed
                | Self::Failed
                | Self::Error
                | Self::Warning
                | Self::Blocker
                | Self::Cancelled
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Blocker => "BLOCKER",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "QUEUED" => Ok(Self::Queued),
            "RUNNING" => Ok(Self::Running),
            "PASSED" => Ok(Self::Passed),
            "FAILED" => Ok(Self::Failed),
            "ERROR" => Ok(Self::Error),
            "WARNING" => Ok(Self::Warning),
            "BLOCKER" => Ok(Self::Blocker),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            _ => Err(format!(
                "unknown job status: {s} (expected one of passed, failed, error, warning, blocker, cancelled)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        for status in WorkStatus::TERMINAL {
            assert!(status.is_terminal());
        }
        assert!(!WorkStatus::Submitted.is_terminal());
        assert!(!WorkStatus::BatchMetricsRunning.is_terminal());
        assert!(!WorkStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let status: WorkStatus = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(status, WorkStatus::Unknown);
        let status: WorkStatus = serde_json::from_str("\"EXPERIENCES_RUNNING\"").unwrap();
        assert_eq!(status, WorkStatus::ExperiencesRunning);
    }

    #[test]
    fn test_job_status_parse_is_case_insensitive() {
        assert_eq!("Error".parse::<JobStatus>().unwrap(), JobStatus::Error);
        assert_eq!("passed".parse::<JobStatus>().unwrap(), JobStatus::Passed);
        assert!("exploded".parse::<JobStatus>().is_err());
    }
}
