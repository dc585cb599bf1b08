//! Task state machine.
//!
//! All status changes go through [`transition`], which enforces the valid
//! transition graph and keeps the attempt counter consistent. The session
//! driver is the only caller; spawned attempts report outcomes back instead
//! of mutating task state themselves.
//!
//! ```text
//! Pending ----> Generating ----> Validating ----> Completed
//!    |              |                 |               |
//!    |              v                 v               v
//!    +--------> Failed <---- Retrying <---------- Retrying
//!                   ^            |                (demotion)
//!                   |            v
//!                   +------- Generating
//! ```

use thiserror::Error;
use tracing::debug;

use crate::task::{FileTask, TaskStatus};

/// Errors from task state transitions.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid transition for task {path}: {from} -> {to}")]
    InvalidTransition {
        path: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("retry budget exhausted for task {path}: {attempts}/{retry_max} attempts")]
    RetryBudgetExhausted {
        path: String,
        attempts: u32,
        retry_max: u32,
    },
}

/// The valid transition graph for [`TaskStatus`].
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Whether `from -> to` is a legal edge.
    pub fn is_valid_transition(from: TaskStatus, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (from, to),
            (Pending, Generating)
                | (Pending, Failed)
                | (Generating, Validating)
                | (Generating, Retrying)
                | (Validating, Completed)
                | (Validating, Retrying)
                | (Retrying, Generating)
                | (Retrying, Failed)
                | (Completed, Retrying)
        )
    }
}

/// Apply a transition to a task, enforcing the graph and attempt budget.
///
/// Entering `Generating` increments the attempt counter; a `Retrying ->
/// Generating` edge additionally requires remaining budget.
pub fn transition(task: &mut FileTask, to: TaskStatus) -> Result<(), StateError> {
    let from = task.status;
    if !TaskStateMachine::is_valid_transition(from, to) {
        return Err(StateError::InvalidTransition {
            path: task.path.clone(),
            from,
            to,
        });
    }
    if from == TaskStatus::Retrying && to == TaskStatus::Generating && task.attempt >= task.retry_max
    {
        return Err(StateError::RetryBudgetExhausted {
            path: task.path.clone(),
            attempts: task.attempt,
            retry_max: task.retry_max,
        });
    }

    if to == TaskStatus::Generating {
        task.attempt += 1;
    }
    task.status = to;
    debug!(path = %task.path, %from, %to, attempt = task.attempt, "task transition");
    Ok(())
}

/// Whether a retrying task has budget for another generation attempt.
pub fn has_retry_budget(task: &FileTask) -> bool {
    task.attempt < task.retry_max
}

// ---------------------------------------------------------------------------
// Dispatch helpers
// ---------------------------------------------------------------------------

/// Pending -> Generating (first attempt) or Retrying -> Generating.
pub fn begin_generating(task: &mut FileTask) -> Result<(), StateError> {
    transition(task, TaskStatus::Generating)
}

/// Generating -> Validating, once the backend returned content.
pub fn begin_validating(task: &mut FileTask) -> Result<(), StateError> {
    transition(task, TaskStatus::Validating)
}

/// Validating -> Completed. Clears stale retry feedback.
pub fn complete_task(task: &mut FileTask) -> Result<(), StateError> {
    transition(task, TaskStatus::Completed)?;
    task.last_issues.clear();
    Ok(())
}

/// Move a task to `Retrying` with the issues to feed the next attempt.
pub fn mark_retrying(task: &mut FileTask, issues: Vec<String>) -> Result<(), StateError> {
    transition(task, TaskStatus::Retrying)?;
    task.last_issues = issues;
    Ok(())
}

/// Completed -> Retrying, after a project-level recheck implicated this
/// file. The stale result stays in place until a new attempt replaces it.
pub fn demote_task(task: &mut FileTask, issues: Vec<String>) -> Result<(), StateError> {
    transition(task, TaskStatus::Retrying)?;
    task.last_issues = issues;
    Ok(())
}

/// Retrying -> Failed, once the budget is exhausted.
pub fn fail_task(task: &mut FileTask) -> Result<(), StateError> {
    transition(task, TaskStatus::Failed)
}

/// Pending -> Failed without consuming any attempt, because a dependency
/// failed permanently.
pub fn block_task(task: &mut FileTask, blocking_path: &str) -> Result<(), StateError> {
    transition(task, TaskStatus::Failed)?;
    task.blocked_by = Some(blocking_path.to_owned());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::FileKind;

    fn task() -> FileTask {
        FileTask::new("WarpFeature.java", FileKind::Feature, "WarpFeature", 3)
    }

    #[test]
    fn happy_path_transitions() {
        let mut t = task();
        begin_generating(&mut t).unwrap();
        assert_eq!(t.status, TaskStatus::Generating);
        assert_eq!(t.attempt, 1);
        begin_validating(&mut t).unwrap();
        complete_task(&mut t).unwrap();
        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(t.retries_used(), 0);
    }

    #[test]
    fn retry_cycle_increments_attempt() {
        let mut t = task();
        begin_generating(&mut t).unwrap();
        begin_validating(&mut t).unwrap();
        mark_retrying(&mut t, vec!["missing class".into()]).unwrap();
        assert_eq!(t.last_issues, vec!["missing class"]);
        begin_generating(&mut t).unwrap();
        assert_eq!(t.attempt, 2);
    }

    #[test]
    fn budget_exhaustion_rejects_regeneration() {
        let mut t = task();
        for _ in 0..3 {
            begin_generating(&mut t).unwrap();
            begin_validating(&mut t).unwrap();
            mark_retrying(&mut t, vec!["bad".into()]).unwrap();
        }
        assert_eq!(t.attempt, 3);
        assert!(!has_retry_budget(&t));
        let err = begin_generating(&mut t).unwrap_err();
        assert!(matches!(err, StateError::RetryBudgetExhausted { .. }));
        fail_task(&mut t).unwrap();
        assert_eq!(t.status, TaskStatus::Failed);
    }

    #[test]
    fn invalid_transition_rejected() {
        let mut t = task();
        let err = complete_task(&mut t).unwrap_err();
        assert!(matches!(err, StateError::InvalidTransition { .. }));
        assert_eq!(t.status, TaskStatus::Pending, "state unchanged on error");
    }

    #[test]
    fn completed_task_can_be_demoted() {
        let mut t = task();
        begin_generating(&mut t).unwrap();
        begin_validating(&mut t).unwrap();
        complete_task(&mut t).unwrap();
        demote_task(&mut t, vec!["duplicate definition of `Warp`".into()]).unwrap();
        assert_eq!(t.status, TaskStatus::Retrying);
        assert_eq!(t.last_issues.len(), 1);
        // Re-generation consumes budget like any other retry.
        begin_generating(&mut t).unwrap();
        assert_eq!(t.attempt, 2);
    }

    #[test]
    fn blocked_task_fails_without_consuming_attempts() {
        let mut t = task();
        block_task(&mut t, "HomesPlugin.java").unwrap();
        assert_eq!(t.status, TaskStatus::Failed);
        assert_eq!(t.attempt, 0);
        assert_eq!(t.blocked_by.as_deref(), Some("HomesPlugin.java"));
    }

    #[test]
    fn completion_clears_stale_issues() {
        let mut t = task();
        begin_generating(&mut t).unwrap();
        begin_validating(&mut t).unwrap();
        mark_retrying(&mut t, vec!["bad".into()]).unwrap();
        begin_generating(&mut t).unwrap();
        begin_validating(&mut t).unwrap();
        complete_task(&mut t).unwrap();
        assert!(t.last_issues.is_empty());
    }

    #[test]
    fn terminal_states_have_no_exits_except_demotion() {
        use TaskStatus::*;
        for to in [Pending, Generating, Validating, Retrying, Completed, Failed] {
            assert!(!TaskStateMachine::is_valid_transition(Failed, to));
        }
        assert!(TaskStateMachine::is_valid_transition(Completed, Retrying));
        assert!(!TaskStateMachine::is_valid_transition(Completed, Generating));
    }
}
