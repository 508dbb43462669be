//! Request bodies sent to the platform.
//!
//! Optional fields are skipped when `None` so update requests only carry the
//! fields that change.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::experience::EnvironmentVariable;
use super::parameters::{ParameterMap, SweepParameter};
use super::project::BranchType;
use super::system::{Architecture, ResourceRequirements};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBranch {
    pub name: String,
    pub branch_type: BranchType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSystem {
    pub name: String,
    pub description: String,
    pub build_resources: ResourceRequirements,
    pub metrics_build_resources: ResourceRequirements,
    pub architecture: Architecture,
}

/// Partial update of a system.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_resources: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_build_resources: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Architecture>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBuild {
    #[serde(rename = "branchID")]
    pub branch_id: Uuid,
    #[serde(rename = "systemID")]
    pub system_id: Uuid,
    pub name: String,
    pub description: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_specification: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildUpdate {
    #[serde(rename = "branchID", skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Server-side filters for build listings.
#[derive(Debug, Clone, Default)]
pub struct BuildFilter {
    pub branch_id: Option<Uuid>,
    pub system_id: Option<Uuid>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMetricsBuild {
    pub name: String,
    pub image_uri: String,
    pub version: String,
    #[serde(rename = "systemIDs")]
    pub system_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExperience {
    pub name: String,
    pub description: String,
    pub locations: Vec<String>,
    pub container_timeout_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(rename = "systemIDs")]
    pub system_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_timeout_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<Vec<EnvironmentVariable>>,
}

impl ExperienceUpdate {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.locations.is_none()
            && self.container_timeout_seconds.is_none()
            && self.profile.is_none()
            && self.environment_variables.is_none()
    }
}

/// Listing filter for experiences. Archived records are excluded unless
/// asked for.
#[derive(Debug, Clone, Default)]
pub struct ExperienceFilter {
    pub name: Option<String>,
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExperienceTag {
    pub name: String,
    pub description: String,
}

/// Body of a batch submission. Experiences come from IDs, tags, or both.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    #[serde(rename = "buildID")]
    pub build_id: Uuid,
    #[serde(rename = "experienceIDs")]
    pub experience_ids: Vec<Uuid>,
    #[serde(rename = "experienceTagIDs")]
    pub experience_tag_ids: Vec<Uuid>,
    #[serde(rename = "metricsBuildID", skip_serializing_if = "Option::is_none")]
    pub metrics_build_id: Option<Uuid>,
    pub parameters: ParameterMap,
    pub pool_labels: Vec<String>,
    pub allowable_failure_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(rename = "associatedAccount", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// One batch is launched per grid point.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSweep {
    #[serde(rename = "buildID")]
    pub build_id: Uuid,
    #[serde(rename = "experienceIDs")]
    pub experience_ids: Vec<Uuid>,
    #[serde(rename = "experienceTagIDs")]
    pub experience_tag_ids: Vec<Uuid>,
    #[serde(rename = "metricsBuildID", skip_serializing_if = "Option::is_none")]
    pub metrics_build_id: Option<Uuid>,
    pub parameters: Vec<SweepParameter>,
    pub pool_labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "associatedAccount", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestSuite {
    pub name: String,
    pub description: String,
    #[serde(rename = "systemID")]
    pub system_id: Uuid,
    #[serde(rename = "experiences")]
    pub experience_ids: Vec<Uuid>,
    #[serde(rename = "metricsBuildID", skip_serializing_if = "Option::is_none")]
    pub metrics_build_id: Option<Uuid>,
    pub show_on_summary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_set_name: Option<String>,
}

/// Changes producing the next suite revision. `metrics_set_name` of
/// `Some("")` clears the metrics set.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteRevision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "systemID", skip_serializing_if = "Option::is_none")]
    pub system_id: Option<Uuid>,
    #[serde(rename = "experiences", skip_serializing_if = "Option::is_none")]
    pub experience_ids: Option<Vec<Uuid>>,
    #[serde(rename = "metricsBuildID", skip_serializing_if = "Option::is_none")]
    pub metrics_build_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_on_summary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_set_name: Option<String>,
}

impl SuiteRevision {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.system_id.is_none()
            && self.experience_ids.is_none()
            && self.metrics_build_id.is_none()
            && self.show_on_summary.is_none()
            && self.metrics_set_name.is_none()
    }
}

/// Launch of a test suite against a build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteRun {
    #[serde(rename = "buildID")]
    pub build_id: Uuid,
    pub parameters: ParameterMap,
    pub pool_labels: Vec<String>,
    pub allowable_failure_percent: u8,
    #[serde(rename = "batchName", skip_serializing_if = "Option::is_none")]
    pub batch_name: Option<String>,
    #[serde(rename = "associatedAccount", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// Metrics report over the suite's batches on a branch within a window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
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
    pub respect_revision_boundary: bool,
    #[serde(rename = "associatedAccount", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSuiteEntry {
    #[serde(rename = "testSuiteID")]
    pub test_suite_id: Uuid,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkflow {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_workflow_link: Option<String>,
    #[serde(rename = "workflowSuites")]
    pub suites: Vec<WorkflowSuiteEntry>,
}

/// Partial update of a workflow. `suites` replaces the whole list.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_workflow_link: Option<String>,
    #[serde(rename = "workflowSuites", skip_serializing_if = "Option::is_none")]
    pub suites: Option<Vec<WorkflowSuiteEntry>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkflowRun {
    #[serde(rename = "buildID")]
    pub build_id: Uuid,
    pub parameters: ParameterMap,
    pub pool_labels: Vec<String>,
    pub allowable_failure_percent: u8,
    #[serde(rename = "associatedAccount", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDebugSession {
    #[serde(rename = "buildID")]
    pub build_id: Uuid,
    #[serde(rename = "experienceID")]
    pub experience_id: Uuid,
    pub pool_labels: Vec<String>,
    /// Replaces the container entrypoint so the job idles for attachment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Local metrics configuration pushed to the platform.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsConfigUpdate {
    pub config: String,
    pub template_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Pre-signed destination for one metrics template file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUpload {
    pub name: String,
    pub upload_url: String,
}
