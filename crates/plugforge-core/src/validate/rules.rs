//! The validation rule registry.
//!
//! Each rule is an independent, named check implementing [`ValidationRule`].
//! The default battery covers syntactic well-formedness, cross-file
//! dependency resolution, naming consistency, and duplicate-definition
//! detection. New rules can be added without touching dispatch: build a
//! custom rule vector and hand it to [`run_battery`].

use std::collections::{BTreeMap, BTreeSet};

use crate::context::ContextSnapshot;
use crate::spec::FileKind;

use super::symbols::{declared_symbols, referenced_symbols, yaml_value};
use super::{CheckOutcome, ValidationReport};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A borrowed view of the file under validation.
#[derive(Debug, Clone, Copy)]
pub struct FileView<'a> {
    pub path: &'a str,
    pub kind: FileKind,
    /// The primary symbol this file is expected to declare. For manifests
    /// this is the plugin name.
    pub expected_symbol: &'a str,
    pub content: &'a str,
}

/// Shared state the rules resolve against.
#[derive(Debug)]
pub struct ValidationContext {
    /// Symbol -> declaring path, over every file in the snapshot.
    pub declared: BTreeMap<String, String>,
    /// Expected symbol -> producing path, over the whole plan.
    pub plan_symbols: BTreeMap<String, String>,
    /// Expected symbols of tasks that may still complete. A reference to an
    /// open symbol is not an error yet; the project-level recheck settles it
    /// once every task is terminal.
    pub open_symbols: BTreeSet<String>,
}

impl ValidationContext {
    /// Build a context from an accumulator snapshot and the plan's symbol
    /// tables.
    pub fn build(
        snapshot: &ContextSnapshot,
        plan_symbols: BTreeMap<String, String>,
        open_symbols: BTreeSet<String>,
    ) -> Self {
        let mut declared = BTreeMap::new();
        for entry in snapshot.entries() {
            for sym in declared_symbols(entry.kind, &entry.content) {
                declared.entry(sym).or_insert_with(|| entry.path.clone());
            }
        }
        Self {
            declared,
            plan_symbols,
            open_symbols,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule trait and dispatch
// ---------------------------------------------------------------------------

/// A single named validation check. Rules are independent: each produces
/// its own [`CheckOutcome`] and never short-circuits the battery.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, file: &FileView<'_>, ctx: &ValidationContext) -> CheckOutcome;
}

/// The default rule battery, in canonical order.
pub fn default_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(SyntaxRule),
        Box::new(DependencyResolutionRule),
        Box::new(NamingRule),
        Box::new(DuplicateDefinitionsRule),
    ]
}

/// Run every rule against the file and collect the outcomes in order.
pub fn run_battery(
    file: &FileView<'_>,
    ctx: &ValidationContext,
    rules: &[Box<dyn ValidationRule>],
) -> ValidationReport {
    ValidationReport {
        checks: rules.iter().map(|r| r.check(file, ctx)).collect(),
    }
}

// ---------------------------------------------------------------------------
// syntax
// ---------------------------------------------------------------------------

/// Syntactic well-formedness for the file's declared kind.
pub struct SyntaxRule;

impl ValidationRule for SyntaxRule {
    fn name(&self) -> &'static str {
        "syntax"
    }

    fn check(&self, file: &FileView<'_>, _ctx: &ValidationContext) -> CheckOutcome {
        let mut issues = Vec::new();

        if file.content.trim().is_empty() {
            issues.push(format!("{}: file is empty", file.path));
        } else {
            match file.kind {
                FileKind::Manifest => check_manifest_syntax(file, &mut issues),
                FileKind::MainClass | FileKind::Feature => {
                    check_class_syntax(file, &mut issues);
                }
                FileKind::Config => check_yaml_syntax(file, &mut issues),
                FileKind::Resource => {}
            }
        }

        if issues.is_empty() {
            CheckOutcome::pass(self.name(), format!("{} is well-formed", file.path))
        } else {
            CheckOutcome::fail(
                self.name(),
                format!("{} has syntax problems", file.path),
                issues,
            )
        }
    }
}

fn check_manifest_syntax(file: &FileView<'_>, issues: &mut Vec<String>) {
    for key in ["name", "version", "main"] {
        if yaml_value(file.content, key).is_none() {
            issues.push(format!("{}: missing required key `{key}`", file.path));
        }
    }
    check_yaml_syntax(file, issues);
}

fn check_yaml_syntax(file: &FileView<'_>, issues: &mut Vec<String>) {
    for (n, line) in file.content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !trimmed.contains(':') && !trimmed.starts_with('-') {
            issues.push(format!(
                "{}: line {} is not a `key: value` entry or list item",
                file.path,
                n + 1
            ));
        }
    }
}

fn check_class_syntax(file: &FileView<'_>, issues: &mut Vec<String>) {
    if declared_symbols(file.kind, file.content).is_empty() {
        issues.push(format!("{}: no class declaration found", file.path));
    }
    let opens = file.content.matches('{').count();
    let closes = file.content.matches('}').count();
    if opens != closes {
        issues.push(format!(
            "{}: unbalanced braces ({opens} opening, {closes} closing)",
            file.path
        ));
    }
}

// ---------------------------------------------------------------------------
// dependency_resolution
// ---------------------------------------------------------------------------

/// Every reference to a plan-produced symbol must resolve against the
/// context snapshot plus this file itself. References to symbols outside
/// the plan (library types) are ignored. References to symbols whose
/// producing task is still open are deferred to the project recheck.
pub struct DependencyResolutionRule;

impl ValidationRule for DependencyResolutionRule {
    fn name(&self) -> &'static str {
        "dependency_resolution"
    }

    fn check(&self, file: &FileView<'_>, ctx: &ValidationContext) -> CheckOutcome {
        let self_declared = declared_symbols(file.kind, file.content);
        let mut issues = Vec::new();

        for reference in referenced_symbols(file.kind, file.content) {
            let Some(producer) = ctx.plan_symbols.get(&reference) else {
                continue; // not a plan symbol; library reference
            };
            if producer == file.path {
                continue; // reference to this file's own symbol
            }
            let resolved = ctx.declared.contains_key(&reference)
                || self_declared.iter().any(|s| *s == reference)
                || ctx.open_symbols.contains(&reference);
            if !resolved {
                issues.push(format!(
                    "{}: unresolved reference to `{reference}` (expected from {producer})",
                    file.path
                ));
            }
        }

        if issues.is_empty() {
            CheckOutcome::pass(self.name(), format!("{}: all references resolve", file.path))
        } else {
            CheckOutcome::fail(
                self.name(),
                format!("{} references undefined symbols", file.path),
                issues,
            )
        }
    }
}

// ---------------------------------------------------------------------------
// naming
// ---------------------------------------------------------------------------

/// The file's self-declared identifier must match what dependents expect:
/// class files must declare their planned class name; manifests must carry
/// the plugin name in their `name` key.
pub struct NamingRule;

impl ValidationRule for NamingRule {
    fn name(&self) -> &'static str {
        "naming_consistency"
    }

    fn check(&self, file: &FileView<'_>, _ctx: &ValidationContext) -> CheckOutcome {
        let mut issues = Vec::new();

        match file.kind {
            FileKind::MainClass | FileKind::Feature => {
                let declared = declared_symbols(file.kind, file.content);
                if !declared.iter().any(|s| s == file.expected_symbol) {
                    let found = declared.first().map(String::as_str).unwrap_or("nothing");
                    issues.push(format!(
                        "{}: expected declaration of `{}`, found `{found}`",
                        file.path, file.expected_symbol
                    ));
                }
            }
            FileKind::Manifest => match yaml_value(file.content, "name") {
                Some(name) if name == file.expected_symbol => {}
                Some(name) => issues.push(format!(
                    "{}: manifest name `{name}` does not match project name `{}`",
                    file.path, file.expected_symbol
                )),
                None => issues.push(format!("{}: manifest has no `name` key", file.path)),
            },
            FileKind::Config | FileKind::Resource => {}
        }

        if issues.is_empty() {
            CheckOutcome::pass(self.name(), format!("{}: naming is consistent", file.path))
        } else {
            CheckOutcome::fail(
                self.name(),
                format!("{} has naming inconsistencies", file.path),
                issues,
            )
        }
    }
}

// ---------------------------------------------------------------------------
// duplicate_definitions
// ---------------------------------------------------------------------------

/// No symbol this file declares may already be declared by a different file
/// in the accumulated context.
pub struct DuplicateDefinitionsRule;

impl ValidationRule for DuplicateDefinitionsRule {
    fn name(&self) -> &'static str {
        "duplicate_definitions"
    }

    fn check(&self, file: &FileView<'_>, ctx: &ValidationContext) -> CheckOutcome {
        let mut issues = Vec::new();

        for sym in declared_symbols(file.kind, file.content) {
            if let Some(other) = ctx.declared.get(&sym) {
                if other != file.path {
                    issues.push(format!(
                        "{}: duplicate definition of `{sym}` (already declared in {other})",
                        file.path
                    ));
                }
            }
        }

        if issues.is_empty() {
            CheckOutcome::pass(self.name(), format!("{}: no duplicate definitions", file.path))
        } else {
            CheckOutcome::fail(
                self.name(),
                format!("{} redefines existing symbols", file.path),
                issues,
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextAccumulator;

    fn empty_ctx() -> ValidationContext {
        ValidationContext::build(
            &ContextSnapshot::empty(),
            BTreeMap::new(),
            BTreeSet::new(),
        )
    }

    fn plan_symbols(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(s, p)| ((*s).to_owned(), (*p).to_owned()))
            .collect()
    }

    // -- syntax --

    #[test]
    fn syntax_accepts_valid_manifest() {
        let file = FileView {
            path: "plugin.yml",
            kind: FileKind::Manifest,
            expected_symbol: "Homes",
            content: "name: Homes\nversion: 1.0.0\nmain: com.x.HomesPlugin\n",
        };
        let outcome = SyntaxRule.check(&file, &empty_ctx());
        assert!(outcome.passed, "issues: {:?}", outcome.issues);
    }

    #[test]
    fn syntax_flags_missing_manifest_keys() {
        let file = FileView {
            path: "plugin.yml",
            kind: FileKind::Manifest,
            expected_symbol: "Homes",
            content: "name: Homes\n",
        };
        let outcome = SyntaxRule.check(&file, &empty_ctx());
        assert!(!outcome.passed);
        assert_eq!(outcome.issues.len(), 2, "version and main both missing");
    }

    #[test]
    fn syntax_flags_empty_file() {
        let file = FileView {
            path: "messages.yml",
            kind: FileKind::Resource,
            expected_symbol: "messages.yml",
            content: "   \n",
        };
        let outcome = SyntaxRule.check(&file, &empty_ctx());
        assert!(!outcome.passed);
    }

    #[test]
    fn syntax_flags_unbalanced_braces() {
        let file = FileView {
            path: "A.java",
            kind: FileKind::Feature,
            expected_symbol: "A",
            content: "public class A {\n  void f() {\n}\n",
        };
        let outcome = SyntaxRule.check(&file, &empty_ctx());
        assert!(!outcome.passed);
        assert!(outcome.issues.iter().any(|i| i.contains("unbalanced")));
    }

    #[test]
    fn syntax_flags_missing_class_declaration() {
        let file = FileView {
            path: "A.java",
            kind: FileKind::Feature,
            expected_symbol: "A",
            content: "// just a comment\n",
        };
        let outcome = SyntaxRule.check(&file, &empty_ctx());
        assert!(!outcome.passed);
    }

    // -- dependency_resolution --

    #[test]
    fn resolution_ignores_library_references() {
        let file = FileView {
            path: "A.java",
            kind: FileKind::Feature,
            expected_symbol: "A",
            content: "import java.util.ArrayList;\nclass A { Object x = new ArrayList(); }",
        };
        let outcome = DependencyResolutionRule.check(&file, &empty_ctx());
        assert!(outcome.passed);
    }

    #[test]
    fn resolution_flags_missing_plan_symbol() {
        let ctx = ValidationContext::build(
            &ContextSnapshot::empty(),
            plan_symbols(&[("WarpFeature", "WarpFeature.java"), ("A", "A.java")]),
            BTreeSet::new(),
        );
        let file = FileView {
            path: "A.java",
            kind: FileKind::Feature,
            expected_symbol: "A",
            content: "class A { WarpFeature w = new WarpFeature(); }",
        };
        let outcome = DependencyResolutionRule.check(&file, &ctx);
        assert!(!outcome.passed);
        assert!(
            outcome.issues[0].contains("WarpFeature"),
            "issue must name the missing symbol: {:?}",
            outcome.issues
        );
    }

    #[test]
    fn resolution_accepts_symbol_from_context() {
        let mut acc = ContextAccumulator::new();
        acc.record(
            "WarpFeature.java",
            FileKind::Feature,
            "public class WarpFeature {}",
        );
        let ctx = ValidationContext::build(
            &acc.snapshot(),
            plan_symbols(&[("WarpFeature", "WarpFeature.java"), ("A", "A.java")]),
            BTreeSet::new(),
        );
        let file = FileView {
            path: "A.java",
            kind: FileKind::Feature,
            expected_symbol: "A",
            content: "class A { WarpFeature w = new WarpFeature(); }",
        };
        let outcome = DependencyResolutionRule.check(&file, &ctx);
        assert!(outcome.passed, "issues: {:?}", outcome.issues);
    }

    #[test]
    fn resolution_defers_open_symbols() {
        // A manifest referencing the not-yet-generated main class passes the
        // per-file check; the project recheck settles it later.
        let ctx = ValidationContext::build(
            &ContextSnapshot::empty(),
            plan_symbols(&[("HomesPlugin", "HomesPlugin.java")]),
            ["HomesPlugin".to_owned()].into_iter().collect(),
        );
        let file = FileView {
            path: "plugin.yml",
            kind: FileKind::Manifest,
            expected_symbol: "Homes",
            content: "name: Homes\nversion: 1.0.0\nmain: com.x.HomesPlugin\n",
        };
        let outcome = DependencyResolutionRule.check(&file, &ctx);
        assert!(outcome.passed, "issues: {:?}", outcome.issues);
    }

    // -- naming --

    #[test]
    fn naming_accepts_expected_class() {
        let file = FileView {
            path: "HomesPlugin.java",
            kind: FileKind::MainClass,
            expected_symbol: "HomesPlugin",
            content: "public class HomesPlugin {}",
        };
        assert!(NamingRule.check(&file, &empty_ctx()).passed);
    }

    #[test]
    fn naming_flags_wrong_class_name() {
        let file = FileView {
            path: "HomesPlugin.java",
            kind: FileKind::MainClass,
            expected_symbol: "HomesPlugin",
            content: "public class HomePlugin {}",
        };
        let outcome = NamingRule.check(&file, &empty_ctx());
        assert!(!outcome.passed);
        assert!(outcome.issues[0].contains("HomesPlugin"));
        assert!(outcome.issues[0].contains("HomePlugin"));
    }

    #[test]
    fn naming_checks_manifest_name_key() {
        let file = FileView {
            path: "plugin.yml",
            kind: FileKind::Manifest,
            expected_symbol: "Homes",
            content: "name: Mines\nversion: 1.0.0\nmain: com.x.HomesPlugin\n",
        };
        let outcome = NamingRule.check(&file, &empty_ctx());
        assert!(!outcome.passed);
    }

    // -- duplicate_definitions --

    #[test]
    fn duplicates_flagged_across_context() {
        let mut acc = ContextAccumulator::new();
        acc.record("A.java", FileKind::Feature, "public class Warp {}");
        let ctx = ValidationContext::build(&acc.snapshot(), BTreeMap::new(), BTreeSet::new());
        let file = FileView {
            path: "B.java",
            kind: FileKind::Feature,
            expected_symbol: "B",
            content: "public class Warp {}",
        };
        let outcome = DuplicateDefinitionsRule.check(&file, &ctx);
        assert!(!outcome.passed);
        assert!(outcome.issues[0].contains("Warp"));
        assert!(outcome.issues[0].contains("A.java"));
    }

    #[test]
    fn own_prior_content_is_not_a_duplicate() {
        // A demoted task re-validating against a snapshot that still holds
        // its own earlier content must not conflict with itself.
        let mut acc = ContextAccumulator::new();
        acc.record("A.java", FileKind::Feature, "public class Warp {}");
        let ctx = ValidationContext::build(&acc.snapshot(), BTreeMap::new(), BTreeSet::new());
        let file = FileView {
            path: "A.java",
            kind: FileKind::Feature,
            expected_symbol: "Warp",
            content: "public class Warp { int v = 2; }",
        };
        let outcome = DuplicateDefinitionsRule.check(&file, &ctx);
        assert!(outcome.passed, "issues: {:?}", outcome.issues);
    }

    // -- battery dispatch --

    #[test]
    fn battery_runs_all_rules_in_order() {
        let file = FileView {
            path: "plugin.yml",
            kind: FileKind::Manifest,
            expected_symbol: "Homes",
            content: "name: Homes\nversion: 1.0.0\nmain: com.x.HomesPlugin\n",
        };
        let rules = default_rules();
        let report = run_battery(&file, &empty_ctx(), &rules);
        let names: Vec<&str> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "syntax",
                "dependency_resolution",
                "naming_consistency",
                "duplicate_definitions"
            ]
        );
    }

    #[test]
    fn battery_collects_every_failing_check() {
        // Empty content fails syntax and naming, but the battery still runs
        // every rule and reports each outcome.
        let file = FileView {
            path: "HomesPlugin.java",
            kind: FileKind::MainClass,
            expected_symbol: "HomesPlugin",
            content: "",
        };
        let rules = default_rules();
        let report = run_battery(&file, &empty_ctx(), &rules);
        assert_eq!(report.checks.len(), 4);
        assert!(!report.passed());
        let failing: Vec<&str> = report
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect();
        assert!(failing.contains(&"syntax"));
        assert!(failing.contains(&"naming_consistency"));
    }
}
