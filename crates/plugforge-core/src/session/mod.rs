//! Session driver: runs a plan to completion by spawning generation
//! attempts in dependency order, enforcing a concurrency limit, and
//! handling retries, demotions, and blocked-failure propagation.
//!
//! All task state lives in the driver. Spawned attempts work against
//! frozen snapshots and report back over a channel; the driver is the only
//! writer, so ordering and the monotonic context guarantee hold without
//! locks.

pub mod lifecycle;
pub mod metrics;
pub mod result;

pub use lifecycle::{AttemptConfig, AttemptDone, AttemptOutcome, run_attempt};
pub use metrics::{SessionMetrics, compute_metrics};
pub use result::{FileDetail, SessionResult};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::{ContextAccumulator, ContextSnapshot};
use crate::generator::GeneratorRegistry;
use crate::plan::build_plan;
use crate::score::score_file;
use crate::spec::{FileKind, ProjectSpec};
use crate::state;
use crate::task::{FileTask, GeneratedFile, TaskStatus};
use crate::validate::recheck_project;

/// Configuration for a generation session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum generation attempts per task.
    pub retry_max: u32,
    /// Maximum number of concurrent generation attempts.
    pub max_concurrent: usize,
    /// Wall time limit per attempt.
    pub task_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry_max: 3,
            max_concurrent: 1,
            task_timeout: Duration::from_secs(120),
        }
    }
}

/// In-memory session state. The driver loop is the sole owner.
struct SessionState {
    tasks: Vec<FileTask>,
    acc: ContextAccumulator,
    plan_symbols: Arc<BTreeMap<String, String>>,
}

impl SessionState {
    fn task_index(&self, id: Uuid) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn all_terminal(&self) -> bool {
        self.tasks.iter().all(|t| t.status.is_terminal())
    }

    /// Expected symbols of class tasks that may still complete.
    fn open_symbols(&self) -> BTreeSet<String> {
        self.tasks
            .iter()
            .filter(|t| {
                matches!(t.kind, FileKind::MainClass | FileKind::Feature)
                    && !t.status.is_terminal()
            })
            .map(|t| t.expected_symbol.clone())
            .collect()
    }

    /// Expected symbols of class tasks that failed permanently.
    fn failed_symbols(&self) -> BTreeSet<String> {
        self.tasks
            .iter()
            .filter(|t| {
                matches!(t.kind, FileKind::MainClass | FileKind::Feature)
                    && t.status == TaskStatus::Failed
            })
            .map(|t| t.expected_symbol.clone())
            .collect()
    }

    /// Apply the result of one finished attempt.
    fn handle_done(&mut self, done: AttemptDone) -> Result<()> {
        let idx = self
            .task_index(done.task_id)
            .with_context(|| format!("unknown task {} in attempt result", done.task_id))?;

        match done.outcome {
            AttemptOutcome::Generated { content, report } => {
                state::begin_validating(&mut self.tasks[idx])?;
                self.tasks[idx].last_report = Some(report.clone());

                if report.passed() {
                    let task = &mut self.tasks[idx];
                    let score = score_file(task.kind, &content, &report, task.retries_used());
                    task.result = Some(GeneratedFile {
                        task_id: task.id,
                        path: task.path.clone(),
                        content: content.clone(),
                        size: content.len(),
                        quality_score: score,
                        created_at: Utc::now(),
                    });
                    let kind = task.kind;
                    state::complete_task(&mut self.tasks[idx])?;
                    self.acc.record(&done.path, kind, &content);
                    info!(path = %done.path, score = score, "file completed");
                    self.recheck_completed()?;
                } else {
                    let issues = report.issues();
                    warn!(
                        path = %done.path,
                        attempt = self.tasks[idx].attempt,
                        issues = issues.len(),
                        "validation failed"
                    );
                    state::mark_retrying(&mut self.tasks[idx], issues)?;
                    self.fail_if_exhausted(idx)?;
                }
            }
            AttemptOutcome::GenerationFailed { error } => {
                warn!(
                    path = %done.path,
                    attempt = self.tasks[idx].attempt,
                    error = %error,
                    "generation attempt failed"
                );
                state::mark_retrying(&mut self.tasks[idx], vec![error])?;
                self.fail_if_exhausted(idx)?;
            }
        }
        Ok(())
    }

    /// Re-run the project-level checks after a completion and demote any
    /// implicated completed files back to retrying.
    fn recheck_completed(&mut self) -> Result<()> {
        let recheck = recheck_project(
            &self.acc.snapshot(),
            &self.plan_symbols,
            &self.open_symbols(),
            &self.failed_symbols(),
        );
        if recheck.passed() {
            return Ok(());
        }

        let all_issues: Vec<String> = recheck
            .outcomes
            .iter()
            .filter(|o| !o.passed)
            .flat_map(|o| o.issues.iter().cloned())
            .collect();

        for path in &recheck.implicated {
            let Some(idx) = self.tasks.iter().position(|t| &t.path == path) else {
                continue;
            };
            if self.tasks[idx].status != TaskStatus::Completed {
                continue;
            }
            let issues: Vec<String> = all_issues
                .iter()
                .filter(|issue| issue.contains(path.as_str()))
                .cloned()
                .collect();
            warn!(path = %path, "project recheck demoted completed file");
            state::demote_task(&mut self.tasks[idx], issues)?;
            self.fail_if_exhausted(idx)?;
        }
        Ok(())
    }

    /// Fail a retrying task whose budget is gone and propagate the failure
    /// to everything waiting on it.
    fn fail_if_exhausted(&mut self, idx: usize) -> Result<()> {
        if self.tasks[idx].status == TaskStatus::Retrying && !state::has_retry_budget(&self.tasks[idx])
        {
            warn!(
                path = %self.tasks[idx].path,
                attempts = self.tasks[idx].attempt,
                "retry budget exhausted, failing task"
            );
            state::fail_task(&mut self.tasks[idx])?;
            self.propagate_blocked()?;
        }
        Ok(())
    }

    /// Fail every pending task whose dependency chain contains a failed
    /// task, without consuming any attempts.
    fn propagate_blocked(&mut self) -> Result<()> {
        loop {
            let blocked: Option<(usize, String)> =
                self.tasks.iter().enumerate().find_map(|(i, task)| {
                    if task.status != TaskStatus::Pending {
                        return None;
                    }
                    task.depends_on
                        .iter()
                        .find(|dep| {
                            self.tasks
                                .iter()
                                .any(|t| t.path == dep.as_str() && t.status == TaskStatus::Failed)
                        })
                        .map(|dep| (i, dep.clone()))
                });
            let Some((idx, dep)) = blocked else {
                return Ok(());
            };
            warn!(path = %self.tasks[idx].path, blocked_by = %dep, "dependency failed, blocking task");
            state::block_task(&mut self.tasks[idx], &dep)?;
        }
    }

    /// Ready tasks: pending with all dependencies completed, plus retrying
    /// tasks (which always have budget left, see `fail_if_exhausted`).
    fn ready_tasks(&self) -> Vec<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter_map(|(i, task)| match task.status {
                TaskStatus::Pending => {
                    let deps_done = task.depends_on.iter().all(|dep| {
                        self.tasks
                            .iter()
                            .any(|t| &t.path == dep && t.status == TaskStatus::Completed)
                    });
                    deps_done.then_some(i)
                }
                TaskStatus::Retrying => Some(i),
                _ => None,
            })
            .collect()
    }

    /// Force every non-terminal task to failed after a cancellation.
    fn cancel_remaining(&mut self) -> Result<()> {
        for idx in 0..self.tasks.len() {
            match self.tasks[idx].status {
                TaskStatus::Completed | TaskStatus::Failed => {}
                TaskStatus::Pending => {
                    state::transition(&mut self.tasks[idx], TaskStatus::Failed)?;
                }
                TaskStatus::Generating | TaskStatus::Validating => {
                    state::mark_retrying(&mut self.tasks[idx], vec!["session cancelled".into()])?;
                    state::fail_task(&mut self.tasks[idx])?;
                }
                TaskStatus::Retrying => {
                    self.tasks[idx].last_issues.push("session cancelled".into());
                    state::fail_task(&mut self.tasks[idx])?;
                }
            }
        }
        Ok(())
    }
}

/// Run a full generation session for a project spec.
///
/// Returns a [`SessionResult`] even for partial and cancelled sessions;
/// `Err` is reserved for setup problems (bad spec, no backends) and
/// internal invariant violations.
pub async fn run_session(
    spec: &ProjectSpec,
    registry: &Arc<GeneratorRegistry>,
    backend: &str,
    config: &SessionConfig,
    cancel: CancellationToken,
) -> Result<SessionResult> {
    let started_at = Utc::now();
    let started = Instant::now();
    let session_id = Uuid::new_v4();

    let plan = build_plan(spec, config.retry_max).context("failed to build plan")?;
    info!(
        session_id = %session_id,
        project = %spec.name,
        tasks = plan.tasks.len(),
        incremental = spec.incremental,
        "session planned"
    );

    // Choose backend: requested, else the registry's deterministic first.
    let backend_name = if registry.get(backend).is_some() {
        backend.to_owned()
    } else if let Some(first) = registry.first() {
        warn!(
            requested = %backend,
            fallback = %first,
            "requested backend not found, falling back to first registered"
        );
        first.to_owned()
    } else {
        bail!("no generation backends registered");
    };

    let mandatory = plan.mandatory_paths();
    let mut st = SessionState {
        plan_symbols: Arc::new(plan.symbol_table()),
        tasks: plan.tasks,
        acc: ContextAccumulator::new(),
    };

    let spec_arc = Arc::new(spec.clone());
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let (tx, mut rx) = mpsc::channel::<AttemptDone>(config.max_concurrent.max(1) * 2);
    let mut in_flight: usize = 0;
    let mut cancelled = false;

    loop {
        // Cancellation: drain in-flight attempts, then fail what is left.
        if cancel.is_cancelled() {
            info!(session_id = %session_id, "session cancelled, draining in-flight attempts");
            let drain_deadline = tokio::time::Instant::now() + Duration::from_secs(10);
            while in_flight > 0 {
                match tokio::time::timeout_at(drain_deadline, rx.recv()).await {
                    Ok(Some(done)) => {
                        in_flight -= 1;
                        st.handle_done(done)?;
                    }
                    _ => break,
                }
            }
            if in_flight > 0 {
                warn!(
                    session_id = %session_id,
                    remaining = in_flight,
                    "drain deadline expired with attempts still in flight"
                );
            }
            st.cancel_remaining()?;
            cancelled = true;
            break;
        }

        // Drain finished attempts (non-blocking).
        while let Ok(done) = rx.try_recv() {
            in_flight -= 1;
            st.handle_done(done)?;
        }

        if st.all_terminal() && in_flight == 0 {
            break;
        }

        // Spawn ready tasks.
        let ready = st.ready_tasks();
        let spawned_any = !ready.is_empty();
        for idx in ready {
            if cancel.is_cancelled() {
                break;
            }
            // At the concurrency cap, wait for a result instead of queueing:
            // the next spawn must see the freshest completed context.
            let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                break;
            };
            state::begin_generating(&mut st.tasks[idx])?;

            let task = st.tasks[idx].clone();
            let prompt_snapshot = if spec_arc.incremental {
                st.acc.snapshot()
            } else {
                ContextSnapshot::empty()
            };
            let validation_snapshot = st.acc.snapshot();
            let open_symbols = st.open_symbols();
            let plan_symbols = Arc::clone(&st.plan_symbols);
            let spec_clone = Arc::clone(&spec_arc);
            let registry_clone = Arc::clone(registry);
            let backend_clone = backend_name.clone();
            let attempt_config = AttemptConfig {
                timeout: config.task_timeout,
            };
            let tx_clone = tx.clone();
            in_flight += 1;

            tokio::spawn(async move {
                let outcome = match registry_clone.get(&backend_clone) {
                    Some(generator) => {
                        run_attempt(
                            &spec_clone,
                            &task,
                            &prompt_snapshot,
                            &validation_snapshot,
                            &plan_symbols,
                            &open_symbols,
                            generator,
                            &attempt_config,
                        )
                        .await
                    }
                    None => AttemptOutcome::GenerationFailed {
                        error: format!("backend '{backend_clone}' not registered"),
                    },
                };

                drop(permit);
                let _ = tx_clone
                    .send(AttemptDone {
                        task_id: task.id,
                        path: task.path.clone(),
                        outcome,
                    })
                    .await;
            });
        }

        // Wait for a result or cancellation when nothing else is ready.
        if in_flight > 0 {
            tokio::select! {
                done = rx.recv() => {
                    if let Some(done) = done {
                        in_flight -= 1;
                        st.handle_done(done)?;
                    }
                }
                _ = cancel.cancelled() => {
                    continue;
                }
            }
        } else if !spawned_any {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
                _ = cancel.cancelled() => {
                    continue;
                }
            }
        }
    }

    // Final project-level verdict over the settled file set.
    let final_recheck = recheck_project(
        &st.acc.snapshot(),
        &st.plan_symbols,
        &BTreeSet::new(),
        &st.failed_symbols(),
    );

    let success = !cancelled
        && mandatory.iter().all(|path| {
            st.tasks
                .iter()
                .any(|t| &t.path == path && t.status == TaskStatus::Completed)
        });

    // Completed files, in completion order.
    let files: Vec<GeneratedFile> = st
        .acc
        .snapshot()
        .entries()
        .iter()
        .filter_map(|entry| {
            st.tasks
                .iter()
                .find(|t| t.path == entry.path && t.status == TaskStatus::Completed)
                .and_then(|t| t.result.clone())
        })
        .collect();

    let metrics = compute_metrics(&st.tasks, started.elapsed());
    info!(
        session_id = %session_id,
        success = success,
        completed = metrics.completed_files,
        failed = metrics.failed_files,
        quality = metrics.session_quality,
        "session finished"
    );

    Ok(SessionResult {
        session_id,
        project: spec.name.trim().to_owned(),
        success,
        cancelled,
        files,
        details: result::file_details(&st.tasks),
        validation: result::aggregate_validation(&st.tasks, &final_recheck),
        metrics,
        started_at,
        finished_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GenerateError, GenerateRequest, Generator};
    use async_trait::async_trait;

    /// Produces passing content when `good`, garbage otherwise.
    struct CannedGenerator {
        backend_name: &'static str,
        good: bool,
    }

    #[async_trait]
    impl Generator for CannedGenerator {
        fn name(&self) -> &str {
            self.backend_name
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<String, GenerateError> {
            if !self.good {
                return Ok("garbage".to_owned());
            }
            Ok(match request.kind {
                FileKind::Manifest => {
                    "name: Homes\nversion: 1.0.0\nmain: com.x.HomesPlugin\n".to_owned()
                }
                _ => format!("public class {} {{}}", request.expected_symbol),
            })
        }
    }

    #[tokio::test]
    async fn unknown_backend_falls_back_to_first_by_name() {
        let spec = ProjectSpec::new("Homes", "a homes plugin");
        let mut registry = GeneratorRegistry::new();
        // Registered out of name order; the fallback must still pick
        // "alpha", whose output passes on the first attempt.
        registry.register(CannedGenerator {
            backend_name: "zulu",
            good: false,
        });
        registry.register(CannedGenerator {
            backend_name: "alpha",
            good: true,
        });

        let result = run_session(
            &spec,
            &Arc::new(registry),
            "missing",
            &SessionConfig::default(),
            CancellationToken::new(),
        )
        .await
        .expect("session should run");

        assert!(result.success, "details: {:?}", result.details);
        assert!(result.details.iter().all(|d| d.attempts == 1));
    }

    #[test]
    fn default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.retry_max, 3);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.task_timeout, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn empty_registry_is_a_setup_error() {
        let spec = ProjectSpec::new("Homes", "a homes plugin");
        let registry = Arc::new(GeneratorRegistry::new());
        let err = run_session(
            &spec,
            &registry,
            "command",
            &SessionConfig::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no generation backends"));
    }

    #[tokio::test]
    async fn bad_spec_is_a_setup_error() {
        let spec = ProjectSpec::new("", "prompt");
        let registry = Arc::new(GeneratorRegistry::new());
        let err = run_session(
            &spec,
            &registry,
            "command",
            &SessionConfig::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("plan"));
    }
}
