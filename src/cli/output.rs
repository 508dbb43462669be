//! Output formatting utilities for the CLI.
//!
//! Three shapes exist: human text, pretty JSON (`--json`), and the single
//! `key=value` line printed for created records under `--github`.

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::display::{action_success, colorize_status};
use crate::domain::models::{EntityKind, WorkStatus};

/// Global output switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputMode {
    pub json: bool,
    pub github: bool,
}

/// Command result printable as text or JSON.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Print `result` to stdout in the selected mode.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Print a record as pretty JSON.
pub fn print_record<T: Serialize>(record: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Truncate a string to a maximum length, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Confirmation printed after a record is created.
#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub kind: EntityKind,
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
    #[serde(skip)]
    details: Vec<(String, String)>,
}

impl Created {
    pub const fn new(kind: EntityKind, id: Uuid) -> Self {
        Self {
            kind,
            id,
            name: None,
            revision: None,
            details: Vec::new(),
        }
    }

    pub fn named(kind: EntityKind, name: impl Into<String>, id: Uuid) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(kind, id)
        }
    }

    #[must_use]
    pub const fn with_revision(mut self, revision: u32) -> Self {
        self.revision = Some(revision);
        self
    }

    /// Extra human-only line.
    #[must_use]
    pub fn with_detail(mut self, label: impl Into<String>, value: impl ToString) -> Self {
        self.details.push((label.into(), value.to_string()));
        self
    }

    /// The `--github` line, without the trailing newline.
    pub fn github_line(&self) -> String {
        match self.revision {
            Some(revision) => format!("{}_id_revision={}/{revision}", self.kind.key(), self.id),
            None => format!("{}_id={}", self.kind.key(), self.id),
        }
    }

    pub fn render(&self, mode: OutputMode) -> String {
        if mode.github {
            return self.github_line();
        }
        if mode.json {
            return serde_json::to_string_pretty(&self.to_json()).unwrap_or_default();
        }
        self.to_human()
    }

    pub fn print(&self, mode: OutputMode) {
        println!("{}", self.render(mode));
    }
}

impl CommandOutput for Created {
    fn to_human(&self) -> String {
        let label = self.kind.label();
        let mut lines = vec![format!("Created {}", self.kind)];
        if let Some(name) = &self.name {
            lines.push(format!("{label} name: {name}"));
        }
        lines.push(format!("{label} ID: {}", self.id));
        if let Some(revision) = self.revision {
            lines.push(format!("Revision: {revision}"));
        }
        lines.extend(self.details.iter().map(|(k, v)| format!("{k}: {v}")));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::Map::new();
        value.insert("kind".to_string(), json!(self.kind));
        value.insert(format!("{}_id", self.kind.key()), json!(self.id));
        if let Some(name) = &self.name {
            value.insert("name".to_string(), json!(name));
        }
        if let Some(revision) = self.revision {
            value.insert("revision".to_string(), json!(revision));
        }
        serde_json::Value::Object(value)
    }
}

/// One-line confirmation for actions on an existing record.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutput {
    pub action: String,
    pub kind: EntityKind,
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ActionOutput {
    pub fn new(action: &str, kind: EntityKind, id: Uuid, name: Option<String>) -> Self {
        Self {
            action: action.to_string(),
            kind,
            id,
            name,
        }
    }
}

impl CommandOutput for ActionOutput {
    fn to_human(&self) -> String {
        let line = match &self.name {
            Some(name) => format!("{} {} {name} ({})", self.action, self.kind, self.id),
            None => format!("{} {} {}", self.action, self.kind, self.id),
        };
        action_success(&line)
    }
}

/// Final status of a wait.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub kind: EntityKind,
    pub id: Uuid,
    pub status: WorkStatus,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        format!(
            "{} {} finished with status {}",
            self.kind.label(),
            self.id,
            colorize_status(self.status)
        )
    }
}

/// Free-form confirmation for changes that have no single record to show.
#[derive(Debug, Clone, Serialize)]
pub struct MessageOutput {
    pub message: String,
}

impl MessageOutput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl CommandOutput for MessageOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_line() {
        let id = Uuid::nil();
        let created = Created::new(EntityKind::Build, id);
        assert_eq!(
            created.render(OutputMode { json: false, github: true }),
            format!("build_id={id}")
        );
        let suite = Created::named(EntityKind::TestSuite, "nightly", id).with_revision(2);
        assert_eq!(suite.github_line(), format!("test_suite_id_revision={id}/2"));
        let metrics = Created::new(EntityKind::MetricsBuild, id);
        assert_eq!(metrics.github_line(), format!("metrics_build_id={id}"));
    }

    #[test]
    fn test_human_lines() {
        let id = Uuid::new_v4();
        let text = Created::named(EntityKind::Project, "P1", id).to_human();
        assert!(text.starts_with("Created project\n"));
        assert!(text.contains("Project name: P1"));
        assert!(text.contains(&format!("Project ID: {id}")));
    }

    #[test]
    fn test_json_has_keyed_id() {
        let id = Uuid::new_v4();
        let value = Created::named(EntityKind::Batch, "b", id).to_json();
        assert_eq!(value["batch_id"], json!(id));
        assert_eq!(value["kind"], json!("batch"));
    }

    #[test]
    fn test_action_line() {
        let id = Uuid::new_v4();
        let action = ActionOutput::new("Cancelled", EntityKind::Batch, id, Some("nightly".into()));
        assert!(action.to_human().ends_with(&format!("Cancelled batch nightly ({id})")));
        assert_eq!(action.to_json()["action"], json!("Cancelled"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long name here", 10), "a long ...");
    }
}
