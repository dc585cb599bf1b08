//! Quality scoring.
//!
//! Scores are heuristic, not a correctness proof: check pass ratio carries
//! most of the weight, content size against a per-kind expectation carries
//! the rest, and prior retries cap the ceiling. A file that needed help
//! getting here cannot score as highly as one that passed first try.

use crate::spec::FileKind;
use crate::task::{FileTask, TaskStatus};
use crate::validate::ValidationReport;

/// Weight of the validation pass ratio.
const PASS_WEIGHT: f64 = 70.0;
/// Weight of the size heuristic.
const SIZE_WEIGHT: f64 = 30.0;
/// Ceiling reduction per retry consumed before the passing attempt.
const RETRY_PENALTY: f64 = 15.0;
/// The ceiling never drops below this, however many retries were needed.
const CEILING_FLOOR: f64 = 40.0;

/// Expected content size in bytes, per file kind.
pub fn expected_size(kind: FileKind) -> usize {
    match kind {
        FileKind::Manifest => 80,
        FileKind::MainClass => 400,
        FileKind::Feature => 300,
        FileKind::Config => 60,
        FileKind::Resource => 40,
    }
}

/// Score one passing file in `[0, 100]`.
///
/// `retries_used` is the number of attempts beyond the first that this
/// task consumed before the content passed.
pub fn score_file(kind: FileKind, content: &str, report: &ValidationReport, retries_used: u32) -> u8 {
    let pass = report.pass_ratio() * PASS_WEIGHT;
    let size = size_factor(kind, content.len()) * SIZE_WEIGHT;
    let ceiling =
        (100.0 - RETRY_PENALTY * f64::from(retries_used)).max(CEILING_FLOOR);
    let score = (pass + size).min(ceiling).clamp(0.0, 100.0);
    score.round() as u8
}

/// Size factor in `[0, 1]`: 1.0 at or above the kind's expected size,
/// scaling down linearly below it. Oversized content is not penalized.
fn size_factor(kind: FileKind, len: usize) -> f64 {
    let expected = expected_size(kind) as f64;
    (len as f64 / expected).min(1.0)
}

/// Session-level quality: the mean per-file score over all terminal tasks,
/// with permanently failed tasks contributing zero. Tasks that never
/// reached a terminal state are excluded.
pub fn session_quality(tasks: &[FileTask]) -> f64 {
    let mut total = 0.0;
    let mut count = 0u32;
    for task in tasks {
        match task.status {
            TaskStatus::Completed => {
                let score = task.result.as_ref().map_or(0, |r| r.quality_score);
                total += f64::from(score);
                count += 1;
            }
            TaskStatus::Failed => {
                count += 1;
            }
            _ => {}
        }
    }
    if count == 0 {
        0.0
    } else {
        total / f64::from(count)
    }
}
