//! Systems: the resource envelope builds and experiences run under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resources assumed when a flag is not given.
pub const DEFAULT_VCPUS: u32 = 4;
pub const DEFAULT_GPUS: u32 = 0;
pub const DEFAULT_MEMORY_MIB: u32 = 16_384;
pub const DEFAULT_SHARED_MEMORY_MB: u32 = 64;

/// Compute requested for each container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    pub vcpus: u32,
    pub gpus: u32,
    #[serde(rename = "memoryMiB")]
    pub memory_mib: u32,
    #[serde(rename = "sharedMemoryMB")]
    pub shared_memory_mb: u32,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            vcpus: DEFAULT_VCPUS,
            gpus: DEFAULT_GPUS,
            memory_mib: DEFAULT_MEMORY_MIB,
            shared_memory_mb: DEFAULT_SHARED_MEMORY_MB,
        }
    }
}

/// CPU architecture builds are compiled for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    Amd64,
    Arm64,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
        })
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "amd64" | "x86_64" => Ok(Self::Amd64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            _ => Err(format!("invalid architecture {s}: expected amd64 or arm64")),
        }
    }
}

/// A named system under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    #[serde(rename = "systemID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Resources for experience containers.
    #[serde(default)]
    pub build_resources: ResourceRequirements,
    /// Resources for metrics containers.
    #[serde(default)]
    pub metrics_build_resources: ResourceRequirements,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default)]
    pub archived: bool,
}
