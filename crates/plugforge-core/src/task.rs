//! File task and generated file types -- the mutable per-file session state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::spec::FileKind;
use crate::validate::ValidationReport;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Status of a file task.
///
/// Terminal states are `Completed` and `Failed`. The valid transition graph
/// is enforced by [`crate::state::TaskStateMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Generating,
    Validating,
    Retrying,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Validating => "validating",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "generating" => Ok(Self::Generating),
            "validating" => Ok(Self::Validating),
            "retrying" => Ok(Self::Retrying),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskStatus`] string.
#[derive(Debug, Clone)]
pub struct TaskStatusParseError(pub String);

impl fmt::Display for TaskStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status: {:?}", self.0)
    }
}

impl std::error::Error for TaskStatusParseError {}

// ---------------------------------------------------------------------------
// GeneratedFile
// ---------------------------------------------------------------------------

/// A generated file. Never mutated after validation passes; a retry produces
/// a new `GeneratedFile` replacing the prior one in the task's result slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// The owning task's id.
    pub task_id: Uuid,
    /// File path within the generated project.
    pub path: String,
    /// The produced text.
    pub content: String,
    /// Content size in bytes.
    pub size: usize,
    /// Per-file quality score in `[0, 100]`.
    pub quality_score: u8,
    /// When this file was produced.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// FileTask
// ---------------------------------------------------------------------------

/// A single file-generation task within a session plan.
#[derive(Debug, Clone)]
pub struct FileTask {
    pub id: Uuid,
    /// File path within the generated project; unique per plan.
    pub path: String,
    pub kind: FileKind,
    /// The primary symbol this file is expected to declare (class name for
    /// class kinds, the file stem otherwise).
    pub expected_symbol: String,
    /// Feature descriptions this task covers. Empty for non-feature kinds;
    /// more than one entry when a dependency cycle was merged.
    pub features: Vec<String>,
    /// Paths of tasks that must be `Completed` before this one generates.
    pub depends_on: Vec<String>,
    pub status: TaskStatus,
    /// Number of generation attempts issued so far.
    pub attempt: u32,
    /// Maximum attempts before the task fails permanently.
    pub retry_max: u32,
    /// Issues from the most recent failed attempt, fed back into the next
    /// retry prompt when agent mode is on.
    pub last_issues: Vec<String>,
    /// When failed due to an unmet dependency, the blocking task's path.
    pub blocked_by: Option<String>,
    /// The most recent validation report for this task, if any.
    pub last_report: Option<ValidationReport>,
    /// The current generated file, once an attempt has completed.
    pub result: Option<GeneratedFile>,
    pub created_at: DateTime<Utc>,
}

impl FileTask {
    /// Create a pending task with no attempts taken.
    pub fn new(
        path: impl Into<String>,
        kind: FileKind,
        expected_symbol: impl Into<String>,
        retry_max: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            kind,
            expected_symbol: expected_symbol.into(),
            features: Vec::new(),
            depends_on: Vec::new(),
            status: TaskStatus::Pending,
            attempt: 0,
            retry_max,
            last_issues: Vec::new(),
            blocked_by: None,
            last_report: None,
            result: None,
            created_at: Utc::now(),
        }
    }

    /// Retries consumed so far: attempts beyond the first.
    pub fn retries_used(&self) -> u32 {
        self.attempt.saturating_sub(1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_display_roundtrip() {
        let variants = [
            TaskStatus::Pending,
            TaskStatus::Generating,
            TaskStatus::Validating,
            TaskStatus::Retrying,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ];
        for v in &variants {
            let s = v.to_string();
            let parsed: TaskStatus = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn task_status_invalid() {
        let result = "stuck".parse::<TaskStatus>();
        assert!(result.is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Generating.is_terminal());
        assert!(!TaskStatus::Validating.is_terminal());
        assert!(!TaskStatus::Retrying.is_terminal());
    }

    #[test]
    fn new_task_starts_pending_with_zero_attempts() {
        let task = FileTask::new("plugin.yml", FileKind::Manifest, "plugin.yml", 3);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.attempt, 0);
        assert_eq!(task.retries_used(), 0);
        assert!(task.result.is_none());
        assert!(task.depends_on.is_empty());
    }

    #[test]
    fn retries_used_is_attempts_minus_one() {
        let mut task = FileTask::new("A.java", FileKind::Feature, "A", 3);
        task.attempt = 3;
        assert_eq!(task.retries_used(), 2);
    }
}
