//! Kinds of platform records, used for messages and machine-readable output.

use std::fmt;

use serde::Serialize;

/// Every record type the client can address by name or ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Branch,
    System,
    Build,
    MetricsBuild,
    Experience,
    ExperienceTag,
    Batch,
    Job,
    Sweep,
    TestSuite,
    Report,
    Workflow,
    WorkflowRun,
    DebugSession,
}

impl EntityKind {
    /// Lower-case display name used inside sentences ("test suite").
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Branch => "branch",
            Self::System => "system",
            Self::Build => "build",
            Self::MetricsBuild => "metrics build",
            Self::Experience => "experience",
            Self::ExperienceTag => "experience tag",
            Self::Batch => "batch",
            Self::Job => "job",
            Self::Sweep => "sweep",
            Self::TestSuite => "test suite",
            Self::Report => "report",
            Self::Workflow => "workflow",
            Self::WorkflowRun => "workflow run",
            Self::DebugSession => "debug session",
        }
    }

    /// Capitalized label used at the start of an output line ("Test suite").
    pub fn label(self) -> String {
        let noun = self.noun();
        let mut chars = noun.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }

    /// Snake-case key used for `key=value` CI output ("test_suite").
    pub fn key(self) -> String {
        self.noun().replace(' ', "_")
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}
