//! Batches, their jobs and logs, parameter sweeps, and debug sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parameters::{ParameterMap, SweepParameter};
use super::status::{JobStatus, WorkStatus};

/// One submission of a build against a set of experiences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    #[serde(rename = "batchID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    /// Human-readable name, generated when none was given.
    #[serde(default)]
    pub friendly_name: String,
    #[serde(rename = "buildID")]
    pub build_id: Uuid,
    #[serde(default, rename = "experienceIDs")]
    pub experience_ids: Vec<Uuid>,
    #[serde(default, rename = "metricsBuildID")]
    pub metrics_build_id: Option<Uuid>,
    #[serde(default)]
    pub parameters: ParameterMap,
    #[serde(default)]
    pub pool_labels: Vec<String>,
    /// Share of jobs that may fail before the batch counts as failed.
    #[serde(default)]
    pub allowable_failure_percent: u8,
    pub status: WorkStatus,
    /// Set when the batch belongs to a sweep.
    #[serde(default, rename = "parameterSweepID")]
    pub sweep_id: Option<Uuid>,
    #[serde(default, rename = "testSuiteID")]
    pub test_suite_id: Option<Uuid>,
    #[serde(default)]
    pub test_suite_revision: Option<u32>,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// One experience run inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "jobID")]
    pub id: Uuid,
    #[serde(rename = "batchID")]
    pub batch_id: Uuid,
    #[serde(rename = "experienceID")]
    pub experience_id: Uuid,
    #[serde(rename = "buildID")]
    pub build_id: Uuid,
    #[serde(rename = "conflatedStatus")]
    pub status: JobStatus,
    #[serde(default)]
    pub experience_name: String,
}

/// Metadata for one log file produced by a job or report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLog {
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub log_type: String,
    /// Pre-signed location the content can be fetched from without credentials.
    #[serde(rename = "logOutputLocation")]
    pub location: String,
}

/// A family of batches spanning the points of a parameter grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sweep {
    #[serde(rename = "parameterSweepID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<SweepParameter>,
    #[serde(default, rename = "batchIDs")]
    pub batch_ids: Vec<Uuid>,
    pub status: WorkStatus,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// Interactive cluster access for a single debug job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSession {
    #[serde(rename = "batchID")]
    pub batch_id: Uuid,
    pub namespace: String,
    pub cluster_endpoint: String,
    /// Bearer token for `cluster_endpoint`.
    #[serde(default)]
    pub cluster_token: String,
    #[serde(default)]
    pub cluster_ca_data: String,
}
