//! Cross-file validation: a fixed battery of named, independent checks.
//!
//! Each rule yields a uniform [`CheckOutcome`]; a file passes only if every
//! check passes. All failing checks are collected, never just the first.
//! Validation is pure and deterministic -- no I/O, no hidden randomness.

pub mod project;
pub mod rules;
pub mod symbols;

pub use project::{ProjectRecheck, recheck_project};
pub use rules::{FileView, ValidationContext, ValidationRule, default_rules, run_battery};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The result of one named validation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Check name (e.g. `dependency_resolution`).
    pub name: String,
    pub passed: bool,
    /// Human-readable summary.
    pub message: String,
    /// Ordered issue strings; empty when the check passed.
    pub issues: Vec<String>,
}

impl CheckOutcome {
    /// A passing outcome with no issues.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            issues: Vec::new(),
        }
    }

    /// A failing outcome carrying the collected issues.
    pub fn fail(
        name: impl Into<String>,
        message: impl Into<String>,
        issues: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
            issues,
        }
    }
}

/// The ordered outcomes of running the full check battery against one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<CheckOutcome>,
}

impl ValidationReport {
    /// A file passes only if every check passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// All issues from failing checks, in check order.
    pub fn issues(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .flat_map(|c| c.issues.iter().cloned())
            .collect()
    }

    /// Ratio of passing checks, in `[0.0, 1.0]`. An empty battery passes.
    pub fn pass_ratio(&self) -> f64 {
        if self.checks.is_empty() {
            return 1.0;
        }
        let passed = self.checks.iter().filter(|c| c.passed).count();
        passed as f64 / self.checks.len() as f64
    }

    /// Look up a check outcome by name.
    pub fn check(&self, name: &str) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.name == name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
