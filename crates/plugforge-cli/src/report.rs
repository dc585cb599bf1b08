//! Rendering session results for the terminal.

use anyhow::Result;

use plugforge_core::session::SessionResult;
use plugforge_core::task::TaskStatus;

/// Print the result as pretty JSON.
pub fn print_json(result: &SessionResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

/// Print a human-readable summary table.
pub fn print_table(result: &SessionResult) {
    println!("Session {} -- {}", result.session_id, result.project);
    println!();

    let path_width = result
        .details
        .iter()
        .map(|d| d.path.len())
        .max()
        .unwrap_or(4)
        .max("FILE".len());

    println!(
        "{:<width$}  {:<10}  {:>8}  {:>5}  NOTES",
        "FILE",
        "STATUS",
        "ATTEMPTS",
        "SCORE",
        width = path_width
    );
    for detail in &result.details {
        let score = detail
            .quality_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_owned());
        let notes = match (&detail.blocked_by, detail.issues.first()) {
            (Some(dep), _) => format!("blocked by {dep}"),
            (None, Some(issue)) if detail.status == TaskStatus::Failed => issue.clone(),
            _ => String::new(),
        };
        println!(
            "{:<width$}  {:<10}  {:>8}  {:>5}  {}",
            detail.path,
            detail.status.to_string(),
            detail.attempts,
            score,
            notes,
            width = path_width
        );
    }

    println!();
    println!("Checks:");
    for (name, outcome) in &result.validation {
        println!("  {}  {}", if outcome.passed { "pass" } else { "FAIL" }, name);
        for issue in &outcome.issues {
            println!("          {issue}");
        }
    }

    let m = &result.metrics;
    println!();
    println!(
        "{}/{} files completed, {} failed ({} blocked), {} retries",
        m.completed_files, m.total_files, m.failed_files, m.blocked_files, m.retries_used
    );
    println!(
        "quality {:.1}/100 in {:.1}s",
        m.session_quality,
        m.duration_ms as f64 / 1000.0
    );
    if result.cancelled {
        println!("session was cancelled before finishing");
    }
    println!(
        "result: {}",
        if result.success { "success" } else { "failure" }
    );
}
