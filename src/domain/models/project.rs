//! Projects and branches.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level namespace that scopes every other record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "projectID")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// What a branch is used for. Only shown, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchType {
    Release,
    Main,
    ChangeRequest,
}

impl BranchType {
    /// Wire spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Release => "RELEASE",
            Self::Main => "MAIN",
            Self::ChangeRequest => "CHANGE_REQUEST",
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BranchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "RELEASE" => Ok(Self::Release),
            "MAIN" => Ok(Self::Main),
            "CHANGE_REQUEST" => Ok(Self::ChangeRequest),
            _ => Err(format!(
                "invalid branch type {s}: expected RELEASE, MAIN, or CHANGE_REQUEST"
            )),
        }
    }
}

/// Named line of builds within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    #[serde(rename = "branchID")]
    pub id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    pub name: String,
    pub branch_type: BranchType,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_type_parse() {
        assert_eq!("change_request".parse::<BranchType>().unwrap(), BranchType::ChangeRequest);
        assert_eq!("MAIN".parse::<BranchType>().unwrap(), BranchType::Main);
        assert!("feature".parse::<BranchType>().is_err());
    }

    #[test]
    fn test_project_wire_shape() {
        let id = Uuid::new_v4();
        let json = serde_json::json!({ "projectID": id, "name": "P1" });
        let project: Project = serde_json::from_value(json).unwrap();
        assert_eq!(project.id, id);
        assert!(!project.archived);
    }
}
