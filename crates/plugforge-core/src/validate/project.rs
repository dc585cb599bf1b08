//! Whole-project revalidation.
//!
//! After a file passes its per-file battery, dependency resolution and
//! duplicate detection are re-run across the full current file set: a later
//! file can invalidate an assumption an earlier passed file made. The
//! recheck names exactly which files are implicated so the session can
//! demote them.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::ContextSnapshot;

use super::symbols::{declared_symbols, referenced_symbols};
use super::CheckOutcome;

/// Result of a whole-project recheck.
#[derive(Debug, Clone)]
pub struct ProjectRecheck {
    /// Project-level outcomes for `dependency_resolution` and
    /// `duplicate_definitions`, in that order.
    pub outcomes: Vec<CheckOutcome>,
    /// Paths of files implicated by a failing project-level check.
    pub implicated: BTreeSet<String>,
}

impl ProjectRecheck {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }
}

/// Re-run dependency resolution and duplicate detection across the full
/// current file set.
///
/// `plan_symbols` maps every expected symbol to its producing path;
/// `open_symbols` holds symbols whose producing task may still complete.
/// References to open symbols are not flagged -- they are settled by the
/// final recheck once every task is terminal. References to symbols whose
/// producing task failed are likewise not flagged here: the failure is
/// already reported through the task's own terminal state.
pub fn recheck_project(
    snapshot: &ContextSnapshot,
    plan_symbols: &BTreeMap<String, String>,
    open_symbols: &BTreeSet<String>,
    failed_symbols: &BTreeSet<String>,
) -> ProjectRecheck {
    // Declared symbol -> every declaring path, over the whole set.
    let mut declared: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in snapshot.entries() {
        for sym in declared_symbols(entry.kind, &entry.content) {
            declared.entry(sym).or_default().push(entry.path.clone());
        }
    }

    let mut implicated = BTreeSet::new();

    // Dependency resolution across the full set.
    let mut resolution_issues = Vec::new();
    for entry in snapshot.entries() {
        for reference in referenced_symbols(entry.kind, &entry.content) {
            let Some(producer) = plan_symbols.get(&reference) else {
                continue;
            };
            if producer == &entry.path
                || declared.contains_key(&reference)
                || open_symbols.contains(&reference)
                || failed_symbols.contains(&reference)
            {
                continue;
            }
            resolution_issues.push(format!(
                "{}: unresolved reference to `{reference}` (expected from {producer})",
                entry.path
            ));
            implicated.insert(entry.path.clone());
        }
    }

    let resolution = if resolution_issues.is_empty() {
        CheckOutcome::pass(
            "dependency_resolution",
            "all cross-file references resolve",
        )
    } else {
        CheckOutcome::fail(
            "dependency_resolution",
            "cross-file references do not resolve",
            resolution_issues,
        )
    };

    // Duplicate definitions across the full set.
    let mut duplicate_issues = Vec::new();
    for (sym, paths) in &declared {
        if paths.len() > 1 {
            duplicate_issues.push(format!(
                "duplicate definition of `{sym}` in {}",
                paths.join(", ")
            ));
            for path in paths {
                implicated.insert(path.clone());
            }
        }
    }

    let duplicates = if duplicate_issues.is_empty() {
        CheckOutcome::pass("duplicate_definitions", "no duplicate definitions")
    } else {
        CheckOutcome::fail(
            "duplicate_definitions",
            "symbols are defined more than once",
            duplicate_issues,
        )
    };

    ProjectRecheck {
        outcomes: vec![resolution, duplicates],
        implicated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextAccumulator;
    use crate::spec::FileKind;

    fn plan_symbols(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(s, p)| ((*s).to_owned(), (*p).to_owned()))
            .collect()
    }

    #[test]
    fn consistent_project_passes() {
        let mut acc = ContextAccumulator::new();
        acc.record(
            "plugin.yml",
            FileKind::Manifest,
            "name: Homes\nversion: 1.0.0\nmain: com.x.HomesPlugin\n",
        );
        acc.record(
            "HomesPlugin.java",
            FileKind::MainClass,
            "public class HomesPlugin {}",
        );

        let recheck = recheck_project(
            &acc.snapshot(),
            &plan_symbols(&[("HomesPlugin", "HomesPlugin.java")]),
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        assert!(recheck.passed(), "outcomes: {:?}", recheck.outcomes);
        assert!(recheck.implicated.is_empty());
    }

    #[test]
    fn manifest_implicated_when_main_class_renamed() {
        // The manifest passed individually (main class was still open), but
        // the main class came back under the wrong name.
        let mut acc = ContextAccumulator::new();
        acc.record(
            "plugin.yml",
            FileKind::Manifest,
            "name: Homes\nversion: 1.0.0\nmain: com.x.HomesPlugin\n",
        );
        acc.record(
            "HomesPlugin.java",
            FileKind::MainClass,
            "public class HomePlugin {}",
        );

        let recheck = recheck_project(
            &acc.snapshot(),
            &plan_symbols(&[("HomesPlugin", "HomesPlugin.java")]),
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        assert!(!recheck.passed());
        assert!(
            recheck.implicated.contains("plugin.yml"),
            "the referencing file is implicated: {:?}",
            recheck.implicated
        );
    }

    #[test]
    fn open_references_not_flagged() {
        let mut acc = ContextAccumulator::new();
        acc.record(
            "plugin.yml",
            FileKind::Manifest,
            "name: Homes\nversion: 1.0.0\nmain: com.x.HomesPlugin\n",
        );

        let recheck = recheck_project(
            &acc.snapshot(),
            &plan_symbols(&[("HomesPlugin", "HomesPlugin.java")]),
            &["HomesPlugin".to_owned()].into_iter().collect(),
            &BTreeSet::new(),
        );
        assert!(recheck.passed(), "outcomes: {:?}", recheck.outcomes);
    }

    #[test]
    fn failed_producer_not_reflagged() {
        // The main class task failed permanently; that is reported through
        // its own terminal state, not by demoting the manifest forever.
        let mut acc = ContextAccumulator::new();
        acc.record(
            "plugin.yml",
            FileKind::Manifest,
            "name: Homes\nversion: 1.0.0\nmain: com.x.HomesPlugin\n",
        );

        let recheck = recheck_project(
            &acc.snapshot(),
            &plan_symbols(&[("HomesPlugin", "HomesPlugin.java")]),
            &BTreeSet::new(),
            &["HomesPlugin".to_owned()].into_iter().collect(),
        );
        assert!(recheck.passed(), "outcomes: {:?}", recheck.outcomes);
    }

    #[test]
    fn duplicates_implicate_every_declaring_file() {
        let mut acc = ContextAccumulator::new();
        acc.record("A.java", FileKind::Feature, "public class Warp {}");
        acc.record("B.java", FileKind::Feature, "public class Warp {}");

        let recheck = recheck_project(
            &acc.snapshot(),
            &BTreeMap::new(),
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        assert!(!recheck.passed());
        assert!(recheck.implicated.contains("A.java"));
        assert!(recheck.implicated.contains("B.java"));
        let dup = &recheck.outcomes[1];
        assert!(dup.issues[0].contains("Warp"));
    }

    #[test]
    fn recheck_is_deterministic() {
        let mut acc = ContextAccumulator::new();
        acc.record("A.java", FileKind::Feature, "public class Warp {}");
        acc.record("B.java", FileKind::Feature, "public class Warp {}");
        let snap = acc.snapshot();

        let a = recheck_project(&snap, &BTreeMap::new(), &BTreeSet::new(), &BTreeSet::new());
        let b = recheck_project(&snap, &BTreeMap::new(), &BTreeSet::new(), &BTreeSet::new());
        assert_eq!(a.outcomes, b.outcomes);
        assert_eq!(a.implicated, b.implicated);
    }
}
