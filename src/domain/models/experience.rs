//! Experiences and experience tags.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-experience run limit when none is given.
pub const DEFAULT_EXPERIENCE_TIMEOUT_SECS: u32 = 3600;

/// Variable set in the experience container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

/// A test scenario: input data locations plus run settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(rename = "experienceID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Storage prefixes holding the experience's input data.
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default = "default_timeout")]
    pub container_timeout_seconds: u32,
    /// Profile passed to the experience container.
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    /// Systems this experience can run against.
    #[serde(default, rename = "systemIDs")]
    pub system_ids: Vec<Uuid>,
    #[serde(default, rename = "experienceTagIDs")]
    pub tag_ids: Vec<Uuid>,
    /// Archived experiences cannot be added to new batches.
    #[serde(default)]
    pub archived: bool,
}

const fn default_timeout() -> u32 {
    DEFAULT_EXPERIENCE_TIMEOUT_SECS
}

/// Label used to select groups of experiences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceTag {
    #[serde(rename = "experienceTagID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
}
