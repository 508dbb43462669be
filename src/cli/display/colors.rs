//! Status color mapping for CLI output.
//!
//! All coloring respects `NO_COLOR` automatically via the `colored` crate.

use colored::Colorize;

use crate::domain::models::{JobStatus, WorkStatus};

/// Color scheme:
/// - Green:  succeeded
/// - Yellow: running, metrics stages
/// - Blue:   submitted
/// - Red:    failed, error
/// - Dim:    cancelled
pub fn colorize_status(status: WorkStatus) -> colored::ColoredString {
    let text = status.as_str();
    match status {
        WorkStatus::Succeeded => text.green().bold(),
        WorkStatus::ExperiencesRunning
        | WorkStatus::BatchMetricsQueued
        | WorkStatus::BatchMetricsRunning
        | WorkStatus::BatchesRunning
        | WorkStatus::Running => text.yellow(),
        WorkStatus::Submitted => text.blue(),
        WorkStatus::Failed => text.red(),
        WorkStatus::Error => text.red().bold(),
        WorkStatus::Cancelled => text.dimmed(),
        WorkStatus::Unknown => text.white(),
    }
}

pub fn colorize_job_status(status: JobStatus) -> colored::ColoredString {
    let text = status.as_str();
    match status {
        JobStatus::Passed => text.green(),
        JobStatus::Queued => text.blue(),
        JobStatus::Running => text.yellow(),
        JobStatus::Warning => text.yellow().bold(),
        JobStatus::Failed | JobStatus::Blocker => text.red(),
        JobStatus::Error => text.red().bold(),
        JobStatus::Cancelled => text.dimmed(),
        JobStatus::Unknown => text.white(),
    }
}

/// Styled label for detail views (bold + dimmed colon).
pub fn label(name: &str) -> String {
    format!("{}{}", name.bold(), ":".dimmed())
}
