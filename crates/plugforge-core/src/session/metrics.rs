//! Session metrics aggregation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::score::session_quality;
use crate::task::{FileTask, TaskStatus};

/// Aggregate counters for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Total number of planned file tasks.
    pub total_files: usize,
    pub completed_files: usize,
    /// All permanently failed tasks, including blocked ones.
    pub failed_files: usize,
    /// Tasks failed without any attempt because a dependency failed.
    pub blocked_files: usize,
    /// Generation attempts issued across all tasks.
    pub attempts_total: u32,
    /// Attempts beyond the first, summed across all tasks.
    pub retries_used: u32,
    /// Mean per-file quality over terminal tasks; failures count as zero.
    pub session_quality: f64,
    pub duration_ms: u64,
}

/// Compute the metrics for a finished (or cancelled) session.
pub fn compute_metrics(tasks: &[FileTask], duration: Duration) -> SessionMetrics {
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let failed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Failed)
        .count();
    let blocked = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Failed && t.blocked_by.is_some())
        .count();

    SessionMetrics {
        total_files: tasks.len(),
        completed_files: completed,
        failed_files: failed,
        blocked_files: blocked,
        attempts_total: tasks.iter().map(|t| t.attempt).sum(),
        retries_used: tasks.iter().map(FileTask::retries_used).sum(),
        session_quality: session_quality(tasks),
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    }
}
