//! Domain errors for the ReSim client.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::{EntityKind, WorkStatus};
use crate::domain::ports::PlatformError;

/// Local argument validation failures. These are always raised before any
/// authentication or network request is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty {0}")]
    Empty(String),

    #[error("invalid {kind}: {value}")]
    Invalid { kind: String, value: String },

    #[error("failed to parse {kind} \"{value}\": {reason}")]
    Parse {
        kind: String,
        value: String,
        reason: String,
    },

    #[error(
        "mutually exclusive parameters: if any flags in the group [{}] are set none of the others can be; [{}] were all set",
        .group.join(" "),
        .set.join(" ")
    )]
    MutuallyExclusive { group: Vec<String>, set: Vec<String> },

    #[error("at least one of the flags in the group [{}] is required", .0.join(" "))]
    MissingOneOf(Vec<String>),

    #[error("if any flags in the group [{}] are set they must all be set; missing [{}]", .group.join(" "), .missing.join(" "))]
    RequiredTogether {
        group: Vec<String>,
        missing: Vec<String>,
    },

    #[error("allowable failure percent must be between 0 and 100, got {0}")]
    AllowableFailurePercent(i64),

    #[error("duplicate parameter name: {0}")]
    DuplicateParameter(String),

    #[error("duplicate value {value:?} for sweep parameter {parameter}")]
    DuplicateValue { parameter: String, value: String },

    #[error("image URI must include a tag (<repository>:<tag>): {0}")]
    UntaggedImage(String),

    #[error("{field} must be {constraint}, got {value}")]
    OutOfRange {
        field: String,
        constraint: String,
        value: String,
    },

    #[error("failed to read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
}

impl ValidationError {
    pub fn empty(field: impl Into<String>) -> Self {
        Self::Empty(field.into())
    }

    pub fn invalid(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Invalid {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn parse(kind: impl Into<String>, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            kind: kind.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors surfaced by services to the command layer.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to find {kind} with name or ID \"{key}\"")]
    NotFound { kind: EntityKind, key: String },

    #[error("{kind} \"{key}\" is ambiguous; matching IDs: {}", format_ids(.ids))]
    Ambiguous {
        kind: EntityKind,
        key: String,
        ids: Vec<Uuid>,
    },

    #[error("{kind} name matches an existing {kind}: {name}")]
    NameConflict { kind: EntityKind, name: String },

    #[error("failed to {action} {kind}: {cause}")]
    Remote {
        action: &'static str,
        kind: EntityKind,
        cause: PlatformError,
    },

    #[error("timed out after {} waiting for {kind} {id}; last status {status}", format_waited(.waited))]
    Timeout {
        kind: EntityKind,
        id: Uuid,
        status: WorkStatus,
        waited: Duration,
    },

    #[error("interrupted while waiting for {kind} {id}")]
    Interrupted { kind: EntityKind, id: Uuid },

    #[error("{kind} does not support {operation}")]
    Unsupported {
        kind: EntityKind,
        operation: &'static str,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Precondition(String),
}

impl DomainError {
    /// Wrap a platform failure with the attempted action.
    pub fn remote(action: &'static str, kind: EntityKind) -> impl FnOnce(PlatformError) -> Self {
        move |cause| Self::Remote {
            action,
            kind,
            cause,
        }
    }

    /// Like [`DomainError::remote`], but maps a conflict to a name collision.
    pub fn on_create(kind: EntityKind, name: &str) -> impl FnOnce(PlatformError) -> Self + '_ {
        move |cause| match cause {
            PlatformError::Conflict(_) => Self::NameConflict {
                kind,
                name: name.to_string(),
            },
            cause => Self::Remote {
                action: "create",
                kind,
                cause,
            },
        }
    }

    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// Whether retrying the same read later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Remote { cause, .. } => cause.is_transient(),
            _ => false,
        }
    }
}

fn format_waited(waited: &Duration) -> String {
    humantime::format_duration(*waited).to_string()
}

fn format_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutually_exclusive_message() {
        let err = ValidationError::MutuallyExclusive {
            group: vec!["experience-tag-ids".into(), "experience-tag-names".into()],
            set: vec!["experience-tag-ids".into(), "experience-tag-names".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("mutually exclusive parameters"));
        assert!(msg.contains(
            "if any flags in the group [experience-tag-ids experience-tag-names] are set none of the others can be"
        ));
    }

    #[test]
    fn test_remote_error_keeps_server_text() {
        let err = DomainError::remote("create", EntityKind::Batch)(PlatformError::Rejected {
            status: 400,
            body: "build is archived".into(),
        });
        assert_eq!(err.to_string(), "failed to create batch: build is archived");
    }

    #[test]
    fn test_conflict_maps_to_name_conflict() {
        let err = DomainError::on_create(EntityKind::Project, "P1")(PlatformError::Conflict(
            "already exists".into(),
        ));
        assert!(err.to_string().contains("project name matches an existing"));
    }

    #[test]
    fn test_not_found_message() {
        let err = DomainError::NotFound {
            kind: EntityKind::Project,
            key: "ghost".into(),
        };
        assert!(err.to_string().starts_with("failed to find project"));
    }
}
