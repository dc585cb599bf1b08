//! Session result assembly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::spec::FileKind;
use crate::task::{FileTask, GeneratedFile, TaskStatus};
use crate::validate::{CheckOutcome, ProjectRecheck};

use super::metrics::SessionMetrics;

/// Per-task summary, in plan order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDetail {
    pub path: String,
    pub kind: FileKind,
    pub status: TaskStatus,
    pub attempts: u32,
    pub retries_used: u32,
    /// Present only for completed tasks.
    pub quality_score: Option<u8>,
    /// Content size in bytes; present only for completed tasks.
    pub size: Option<usize>,
    /// When the accepted content was produced; present only for completed
    /// tasks.
    pub created_at: Option<DateTime<Utc>>,
    /// Issues from the last failed attempt, empty for clean completions.
    pub issues: Vec<String>,
    /// Set when the task failed because a dependency failed.
    pub blocked_by: Option<String>,
}

/// The full outcome of one generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: Uuid,
    pub project: String,
    /// True when every mandatory artifact (manifest and main class)
    /// completed and the session was not cancelled.
    pub success: bool,
    pub cancelled: bool,
    /// Completed files, in completion order.
    pub files: Vec<GeneratedFile>,
    /// Per-task details, in plan order.
    pub details: Vec<FileDetail>,
    /// Check name -> aggregated outcome over every file and the final
    /// project recheck, with every failing check's issues carried through.
    pub validation: BTreeMap<String, CheckOutcome>,
    pub metrics: SessionMetrics,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Fold per-file reports and the final project recheck into one map of
/// check name -> aggregated outcome.
///
/// A check passes overall only if it passed for every file and at project
/// level; the first failure supplies the message and every failure's
/// issues are collected.
pub fn aggregate_validation(
    tasks: &[FileTask],
    final_recheck: &ProjectRecheck,
) -> BTreeMap<String, CheckOutcome> {
    let mut validation: BTreeMap<String, CheckOutcome> = BTreeMap::new();
    for task in tasks {
        if let Some(report) = &task.last_report {
            for check in &report.checks {
                fold_check(&mut validation, check);
            }
        }
    }
    for outcome in &final_recheck.outcomes {
        fold_check(&mut validation, outcome);
    }
    validation
}

fn fold_check(validation: &mut BTreeMap<String, CheckOutcome>, check: &CheckOutcome) {
    let entry = validation
        .entry(check.name.clone())
        .or_insert_with(|| CheckOutcome::pass(check.name.clone(), "passed for every file"));
    if !check.passed {
        if entry.passed {
            entry.passed = false;
            entry.message = check.message.clone();
        }
        entry.issues.extend(check.issues.iter().cloned());
    }
}

/// Build the per-task detail rows, in plan order.
pub fn file_details(tasks: &[FileTask]) -> Vec<FileDetail> {
    tasks
        .iter()
        .map(|task| {
            let produced = (task.status == TaskStatus::Completed)
                .then_some(task.result.as_ref())
                .flatten();
            FileDetail {
                path: task.path.clone(),
                kind: task.kind,
                status: task.status,
                attempts: task.attempt,
                retries_used: task.retries_used(),
                quality_score: produced.map(|r| r.quality_score),
                size: produced.map(|r| r.size),
                created_at: produced.map(|r| r.created_at),
                issues: task.last_issues.clone(),
                blocked_by: task.blocked_by.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationReport;

    fn task_with_report(path: &str, checks: Vec<CheckOutcome>) -> FileTask {
        let mut task = FileTask::new(path, FileKind::Feature, "X", 3);
        task.last_report = Some(ValidationReport { checks });
        task
    }

    fn empty_recheck() -> ProjectRecheck {
        ProjectRecheck {
            outcomes: vec![
                CheckOutcome::pass("dependency_resolution", "ok"),
                CheckOutcome::pass("duplicate_definitions", "ok"),
            ],
            implicated: Default::default(),
        }
    }

    #[test]
    fn aggregation_ands_across_files() {
        let tasks = vec![
            task_with_report("A.java", vec![CheckOutcome::pass("syntax", "ok")]),
            task_with_report(
                "B.java",
                vec![CheckOutcome::fail("syntax", "bad", vec!["empty".into()])],
            ),
        ];
        let validation = aggregate_validation(&tasks, &empty_recheck());
        assert!(!validation.get("syntax").unwrap().passed);
        assert!(validation.get("dependency_resolution").unwrap().passed);
    }

    #[test]
    fn aggregation_keeps_messages_and_issues_from_failing_checks() {
        let tasks = vec![
            task_with_report(
                "A.java",
                vec![CheckOutcome::fail("syntax", "A is broken", vec!["A: empty".into()])],
            ),
            task_with_report(
                "B.java",
                vec![CheckOutcome::fail("syntax", "B is broken", vec!["B: empty".into()])],
            ),
        ];
        let validation = aggregate_validation(&tasks, &empty_recheck());

        let syntax = validation.get("syntax").unwrap();
        assert!(!syntax.passed);
        assert_eq!(syntax.message, "A is broken", "first failure supplies the message");
        assert_eq!(syntax.issues, vec!["A: empty", "B: empty"]);

        let resolution = validation.get("dependency_resolution").unwrap();
        assert!(resolution.passed);
        assert!(resolution.issues.is_empty());
    }

    #[test]
    fn project_recheck_failure_overrides_per_file_pass() {
        let tasks = vec![task_with_report(
            "A.java",
            vec![CheckOutcome::pass("duplicate_definitions", "ok")],
        )];
        let recheck = ProjectRecheck {
            outcomes: vec![CheckOutcome::fail(
                "duplicate_definitions",
                "bad",
                vec!["duplicate `X`".into()],
            )],
            implicated: Default::default(),
        };
        let validation = aggregate_validation(&tasks, &recheck);
        let duplicates = validation.get("duplicate_definitions").unwrap();
        assert!(!duplicates.passed);
        assert_eq!(duplicates.issues, vec!["duplicate `X`"]);
    }

    #[test]
    fn details_carry_block_info() {
        let mut task = FileTask::new("C.java", FileKind::Feature, "C", 3);
        task.status = TaskStatus::Failed;
        task.blocked_by = Some("B.java".to_owned());

        let details = file_details(&[task]);
        assert_eq!(details[0].status, TaskStatus::Failed);
        assert_eq!(details[0].blocked_by.as_deref(), Some("B.java"));
        assert_eq!(details[0].quality_score, None);
        assert_eq!(details[0].size, None);
        assert_eq!(details[0].created_at, None);
    }

    #[test]
    fn completed_details_carry_size_and_timestamp() {
        let mut task = FileTask::new("A.java", FileKind::Feature, "A", 3);
        task.status = TaskStatus::Completed;
        let produced_at = Utc::now();
        task.result = Some(GeneratedFile {
            task_id: task.id,
            path: task.path.clone(),
            content: "public class A {}".to_owned(),
            size: 17,
            quality_score: 100,
            created_at: produced_at,
        });

        let details = file_details(&[task]);
        assert_eq!(details[0].quality_score, Some(100));
        assert_eq!(details[0].size, Some(17));
        assert_eq!(details[0].created_at, Some(produced_at));
    }
}
