//! Session-scoped context accumulator.
//!
//! Holds the full content of every completed file, in completion order, and
//! exposes a cheap read-only snapshot to each generation step. The
//! accumulator is owned by the session driver; it never shrinks for the
//! session's lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use crate::spec::FileKind;

/// One completed file's content within a snapshot.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub path: String,
    pub kind: FileKind,
    pub content: Arc<str>,
}

/// A read-only, immutable view of the accumulator at a point in time.
///
/// Cloning is cheap (a single `Arc` clone), so snapshots can be handed to
/// spawned generation attempts without copying file contents.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    entries: Arc<Vec<ContextEntry>>,
}

impl ContextSnapshot {
    /// An empty snapshot, used for non-incremental prompt context.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    pub fn get(&self, path: &str) -> Option<&ContextEntry> {
        self.entries.iter().find(|e| e.path == path)
    }
}

/// Accumulates completed file contents in completion order.
///
/// [`ContextAccumulator::record`] appends exactly once per first
/// completion; if a task is demoted by the project-level recheck and later
/// re-completes, the entry is replaced in place so the original completion
/// order is preserved. There is no removal operation.
#[derive(Debug, Default)]
pub struct ContextAccumulator {
    entries: Vec<ContextEntry>,
    index: HashMap<String, usize>,
}

impl ContextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed file's content.
    ///
    /// Appends on first completion; replaces in place on re-completion.
    pub fn record(&mut self, path: &str, kind: FileKind, content: &str) {
        let entry = ContextEntry {
            path: path.to_owned(),
            kind,
            content: Arc::from(content),
        };
        match self.index.get(path) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(path.to_owned(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Take an immutable snapshot of the current state.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            entries: Arc::new(self.entries.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let acc = ContextAccumulator::new();
        assert!(acc.is_empty());
        assert!(acc.snapshot().is_empty());
    }

    #[test]
    fn records_in_completion_order() {
        let mut acc = ContextAccumulator::new();
        acc.record("plugin.yml", FileKind::Manifest, "name: X");
        acc.record("XPlugin.java", FileKind::MainClass, "class XPlugin {}");

        let snap = acc.snapshot();
        let paths: Vec<&str> = snap.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["plugin.yml", "XPlugin.java"]);
    }

    #[test]
    fn snapshot_is_immutable_view() {
        let mut acc = ContextAccumulator::new();
        acc.record("plugin.yml", FileKind::Manifest, "name: X");
        let snap = acc.snapshot();

        acc.record("XPlugin.java", FileKind::MainClass, "class XPlugin {}");
        // The earlier snapshot must not see the later completion.
        assert_eq!(snap.len(), 1);
        assert!(!snap.contains("XPlugin.java"));
    }

    #[test]
    fn recompletion_replaces_in_place() {
        let mut acc = ContextAccumulator::new();
        acc.record("plugin.yml", FileKind::Manifest, "name: X");
        acc.record("XPlugin.java", FileKind::MainClass, "class XPlugin {}");
        acc.record("plugin.yml", FileKind::Manifest, "name: Y");

        let snap = acc.snapshot();
        assert_eq!(snap.len(), 2, "replacement must not append");
        let paths: Vec<&str> = snap.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["plugin.yml", "XPlugin.java"],
            "order preserved on replacement"
        );
        assert_eq!(&*snap.get("plugin.yml").unwrap().content, "name: Y");
    }

    #[test]
    fn lookup_by_path() {
        let mut acc = ContextAccumulator::new();
        acc.record("config.yml", FileKind::Config, "max: 3");
        let snap = acc.snapshot();
        assert!(snap.contains("config.yml"));
        assert_eq!(snap.get("config.yml").unwrap().kind, FileKind::Config);
        assert!(snap.get("other.yml").is_none());
    }
}
