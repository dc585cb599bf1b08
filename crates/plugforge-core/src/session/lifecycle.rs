//! One generation attempt: prompt materialization, backend call, and the
//! per-file validation battery.
//!
//! Attempts run inside spawned tasks against frozen snapshots; they never
//! mutate task state. The session driver applies transitions when the
//! [`AttemptDone`] message comes back.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::ContextSnapshot;
use crate::generator::{GenerateError, GenerateRequest, Generator, build_file_prompt};
use crate::spec::ProjectSpec;
use crate::task::FileTask;
use crate::validate::{
    FileView, ValidationContext, ValidationReport, default_rules, run_battery,
};

/// Per-attempt configuration.
#[derive(Debug, Clone)]
pub struct AttemptConfig {
    /// Wall time limit for the backend call.
    pub timeout: Duration,
}

/// Outcome of one attempt. `Generated` carries the validation report even
/// when checks failed; `GenerationFailed` means no content was produced.
#[derive(Debug)]
pub enum AttemptOutcome {
    Generated {
        content: String,
        report: ValidationReport,
    },
    GenerationFailed {
        error: String,
    },
}

/// Message sent from spawned attempts back to the session loop.
#[derive(Debug)]
pub struct AttemptDone {
    pub task_id: Uuid,
    pub path: String,
    pub outcome: AttemptOutcome,
}

/// Run one attempt for a task.
///
/// `prompt_snapshot` is what the backend sees (empty in non-incremental
/// mode); `validation_snapshot` is always the real accumulated state so
/// validation checks the project as it actually is.
#[allow(clippy::too_many_arguments)]
pub async fn run_attempt(
    spec: &ProjectSpec,
    task: &FileTask,
    prompt_snapshot: &ContextSnapshot,
    validation_snapshot: &ContextSnapshot,
    plan_symbols: &BTreeMap<String, String>,
    open_symbols: &BTreeSet<String>,
    generator: &dyn Generator,
    config: &AttemptConfig,
) -> AttemptOutcome {
    let prompt = build_file_prompt(spec, task, prompt_snapshot);
    let request = GenerateRequest {
        task_id: task.id,
        path: task.path.clone(),
        kind: task.kind,
        expected_symbol: task.expected_symbol.clone(),
        attempt: task.attempt,
        prompt,
    };

    debug!(
        path = %task.path,
        attempt = task.attempt,
        backend = %generator.name(),
        context_files = prompt_snapshot.len(),
        "starting generation attempt"
    );

    let content = match tokio::time::timeout(config.timeout, generator.generate(&request)).await {
        Ok(Ok(content)) => content,
        Ok(Err(err)) => {
            warn!(path = %task.path, attempt = task.attempt, error = %err, "generation failed");
            return AttemptOutcome::GenerationFailed {
                error: err.to_string(),
            };
        }
        Err(_) => {
            let err = GenerateError::Timeout {
                seconds: config.timeout.as_secs(),
            };
            warn!(path = %task.path, attempt = task.attempt, error = %err, "generation timed out");
            return AttemptOutcome::GenerationFailed {
                error: err.to_string(),
            };
        }
    };

    let view = FileView {
        path: &task.path,
        kind: task.kind,
        expected_symbol: &task.expected_symbol,
        content: &content,
    };
    let ctx = ValidationContext::build(
        validation_snapshot,
        plan_symbols.clone(),
        open_symbols.clone(),
    );
    let report = run_battery(&view, &ctx, &default_rules());

    debug!(
        path = %task.path,
        attempt = task.attempt,
        passed = report.passed(),
        "attempt validated"
    );

    AttemptOutcome::Generated { content, report }
}
