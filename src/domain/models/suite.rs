//! Test suites and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::WorkStatus;

/// A versioned bundle of experiences run together against a system.
/// Revisions start at 0 and every revise creates the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    #[serde(rename = "testSuiteID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "testSuiteRevision")]
    pub revision: u32,
    #[serde(rename = "systemID")]
    pub system_id: Uuid,
    #[serde(default, rename = "experiences")]
    pub experience_ids: Vec<Uuid>,
    #[serde(default, rename = "metricsBuildID")]
    pub metrics_build_id: Option<Uuid>,
    #[serde(default)]
    pub show_on_summary: bool,
    #[serde(default)]
    pub metrics_set_name: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

/// Aggregate metrics over a suite's batches on a branch within a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "reportID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    pub name: String,
    #[serde(rename = "testSuiteID")]
    pub test_suite_id: Uuid,
    pub test_suite_revision: u32,
    #[serde(rename = "branchID")]
    pub branch_id: Uuid,
    #[serde(rename = "metricsBuildID")]
    pub metrics_build_id: Uuid,
    pub start_timestamp: DateTime<Utc>,
    pub end_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub respect_revision_boundary: bool,
    pub status: WorkStatus,
}
