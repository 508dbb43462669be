//! Builds and metrics builds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A container image (or compose spec) registered on a branch for a system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    #[serde(rename = "buildID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    #[serde(rename = "branchID")]
    pub branch_id: Uuid,
    #[serde(rename = "systemID")]
    pub system_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub build_specification: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// An image that computes metrics over job outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBuild {
    #[serde(rename = "metricsBuildID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    pub name: String,
    pub image_uri: String,
    pub version: String,
    #[serde(default, rename = "systemIDs")]
    pub system_ids: Vec<Uuid>,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}
