//! Workflows: named groups of test suites launched together from CI.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parameters::ParameterMap;
use super::status::WorkStatus;

/// Membership of one suite in a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSuite {
    #[serde(rename = "testSuiteID")]
    pub test_suite_id: Uuid,
    /// Disabled suites are skipped when the workflow runs.
    pub enabled: bool,
}

/// Suites launched together from one CI step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(rename = "workflowID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Link to the CI job that triggers the workflow.
    #[serde(default)]
    pub ci_workflow_link: Option<String>,
    #[serde(default, rename = "workflowSuites")]
    pub suites: Vec<WorkflowSuite>,
    #[serde(default)]
    pub archived: bool,
}

/// The batch launched for one suite of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunSuite {
    #[serde(rename = "testSuiteID")]
    pub test_suite_id: Uuid,
    pub test_suite_revision: u32,
    #[serde(rename = "batchID")]
    pub batch_id: Uuid,
}

/// One execution of a workflow against a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    #[serde(rename = "workflowRunID")]
    pub id: Uuid,
    #[serde(rename = "workflowID")]
    pub workflow_id: Uuid,
    #[serde(rename = "buildID")]
    pub build_id: Uuid,
    #[serde(default)]
    pub parameters: ParameterMap,
    #[serde(default)]
    pub pool_labels: Vec<String>,
    #[serde(default)]
    pub allowable_failure_percent: u8,
    #[serde(default, rename = "workflowRunTestSuites")]
    pub suites: Vec<WorkflowRunSuite>,
    pub status: WorkStatus,
}
