//! Process exit codes for CI.
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | succeeded, or the command has no status to report |
//! | 1 | the command itself failed, or its arguments were invalid (see stderr) |
//! | 2 | tests ran and some failed |
//! | 3 | infrastructure error |
//! | 4 | still submitted or running |
//! | 5 | cancelled |

use crate::domain::models::WorkStatus;

/// Code used when a command returns an error or its arguments do not parse.
pub const COMMAND_FAILED: i32 = 1;

/// Outcome of a wait, as the process exit code CI scripts branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiExit {
    Success,
    Failed,
    Error,
    Pending,
    Cancelled,
}

impl CiExit {
    /// Any non-terminal status counts as pending.
    pub const fn from_status(status: WorkStatus) -> Self {
        match status {
            WorkStatus::Succeeded => Self::Success,
            WorkStatus::Failed => Self::Failed,
            WorkStatus::Error => Self::Error,
            WorkStatus::Cancelled => Self::Cancelled,
            WorkStatus::Submitted
            | WorkStatus::ExperiencesRunning
            | WorkStatus::BatchMetricsQueued
            | WorkStatus::BatchMetricsRunning
            | WorkStatus::BatchesRunning
            | WorkStatus::Running
            | WorkStatus::Unknown => Self::Pending,
        }
    }

    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed => 2,
            Self::Error => 3,
            Self::Pending => 4,
            Self::Cancelled => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_codes() {
        assert_eq!(CiExit::from_status(WorkStatus::Succeeded).code(), 0);
        assert_eq!(CiExit::from_status(WorkStatus::Failed).code(), 2);
        assert_eq!(CiExit::from_status(WorkStatus::Error).code(), 3);
        assert_eq!(CiExit::from_status(WorkStatus::Cancelled).code(), 5);
    }

    #[test]
    fn test_non_terminal_is_pending() {
        for status in [
            WorkStatus::Submitted,
            WorkStatus::ExperiencesRunning,
            WorkStatus::BatchMetricsQueued,
            WorkStatus::BatchesRunning,
            WorkStatus::Unknown,
        ] {
            assert_eq!(CiExit::from_status(status), CiExit::Pending);
        }
        assert_ne!(CiExit::Pending.code(), COMMAND_FAILED);
    }
}
