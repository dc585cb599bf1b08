//! Plan builder: turns a [`ProjectSpec`] into an ordered, acyclic sequence
//! of file tasks.
//!
//! Dependencies are derived structurally: the manifest depends on nothing,
//! the main class on the manifest, feature files on the main class, and the
//! config file on the feature that consumes it. Feature-to-feature edges
//! come from textual cross-references; cycles among features are merged
//! into a single combined task rather than reported as errors.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::spec::{FileKind, ProjectSpec};
use crate::task::FileTask;

/// Errors from plan building. Planning fails only when the spec lacks its
/// minimum required fields; everything else always produces a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("project spec is missing a name")]
    MissingName,

    #[error("project spec is missing a prompt")]
    MissingPrompt,
}

/// An ordered, validated plan. Task order is the deterministic generation
/// order: dependency order, ties broken by feature declaration order, then
/// alphabetically by path.
#[derive(Debug, Clone)]
pub struct Plan {
    pub tasks: Vec<FileTask>,
}

impl Plan {
    /// Expected class symbol -> producing path, over all class-kind tasks.
    pub fn symbol_table(&self) -> BTreeMap<String, String> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.kind, FileKind::MainClass | FileKind::Feature))
            .map(|t| (t.expected_symbol.clone(), t.path.clone()))
            .collect()
    }

    /// Paths of the mandatory artifacts (manifest and main class) whose
    /// completion defines session success.
    pub fn mandatory_paths(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.kind, FileKind::Manifest | FileKind::MainClass))
            .map(|t| t.path.clone())
            .collect()
    }

    pub fn task(&self, path: &str) -> Option<&FileTask> {
        self.tasks.iter().find(|t| t.path == path)
    }
}

// ---------------------------------------------------------------------------
// Symbol naming
// ---------------------------------------------------------------------------

/// Split free text into capitalized ASCII-alphanumeric words.
pub fn sanitize_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Maximum words used to derive a feature class stem.
const STEM_WORDS: usize = 4;

fn camel(text: &str, max_words: usize) -> String {
    let words = sanitize_words(text);
    let joined: String = words.into_iter().take(max_words).collect();
    if joined.is_empty() {
        "Unnamed".to_owned()
    } else {
        joined
    }
}

/// Main class name derived from the project name (e.g. `HomesPlugin`).
pub fn main_class_name(project_name: &str) -> String {
    camel(project_name, usize::MAX) + "Plugin"
}

/// Feature class name derived from a feature description
/// (e.g. "set home" -> `SetHomeFeature`).
pub fn feature_class_name(feature: &str) -> String {
    feature_stem(feature) + "Feature"
}

fn feature_stem(feature: &str) -> String {
    camel(feature, STEM_WORDS)
}

// ---------------------------------------------------------------------------
// Plan building
// ---------------------------------------------------------------------------

/// Build the ordered task plan for a project spec.
///
/// Fails only for a missing name or prompt. An empty feature list yields
/// the minimal two-task plan (manifest, main class).
pub fn build_plan(spec: &ProjectSpec, retry_max: u32) -> Result<Plan, PlanError> {
    let name = spec.name.trim();
    if name.is_empty() {
        return Err(PlanError::MissingName);
    }
    if spec.prompt.trim().is_empty() {
        return Err(PlanError::MissingPrompt);
    }

    let main_class = main_class_name(name);
    let main_path = format!("{main_class}.java");
    let manifest_path = "plugin.yml".to_owned();

    // Derive per-feature class stems, deduplicating collisions by ordinal.
    let mut stems: Vec<String> = Vec::new();
    for feature in &spec.features {
        let mut stem = feature_stem(feature);
        let mut ordinal = 2usize;
        while stems.contains(&stem) {
            stem = format!("{}{}", feature_stem(feature), ordinal);
            ordinal += 1;
        }
        stems.push(stem);
    }

    // Feature-to-feature reference edges: feature i depends on feature j
    // when i's text mentions j's class name or j's full description.
    let n = spec.features.len();
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n]; // i -> deps of i
    for i in 0..n {
        let text_i = spec.features[i].to_ascii_lowercase();
        for j in 0..n {
            if i == j {
                continue;
            }
            let class_j = format!("{}feature", stems[j].to_ascii_lowercase());
            let text_j = spec.features[j].trim().to_ascii_lowercase();
            let mentions_class = text_i.contains(&class_j);
            let mentions_text = text_j.len() >= 4 && text_i.contains(&text_j);
            if mentions_class || mentions_text {
                edges[i].push(j);
            }
        }
    }

    // Merge strongly connected feature groups: a cycle is a modeling
    // signal, not an error.
    let groups = feature_groups(n, &edges);

    // Assemble feature tasks, one per group, in earliest-member order.
    let mut group_of = vec![0usize; n];
    for (g, members) in groups.iter().enumerate() {
        for &m in members {
            group_of[m] = g;
        }
    }

    struct FeatureGroup {
        path: String,
        class: String,
        members: Vec<usize>,
        deps: Vec<String>,
    }

    let mut feature_tasks: Vec<FeatureGroup> = Vec::new();
    for members in &groups {
        let stem: String = members.iter().map(|&m| stems[m].clone()).collect();
        let class = format!("{stem}Feature");
        feature_tasks.push(FeatureGroup {
            path: format!("{class}.java"),
            class,
            members: members.clone(),
            deps: vec![main_path.clone()],
        });
    }
    for (g, group) in feature_tasks.iter_mut().enumerate() {
        for &m in &groups[g] {
            for &dep in &edges[m] {
                let dep_group = group_of[dep];
                if dep_group != g {
                    let dep_path = format!(
                        "{}Feature.java",
                        groups[dep_group]
                            .iter()
                            .map(|&x| stems[x].clone())
                            .collect::<String>()
                    );
                    if !group.deps.contains(&dep_path) {
                        group.deps.push(dep_path);
                    }
                }
            }
        }
    }
    // Config file when a feature asks for one; it depends on the first
    // feature file that mentions configuration.
    let config_dep = spec.features.iter().position(|f| {
        let lower = f.to_ascii_lowercase();
        lower.contains("config") || lower.contains("setting")
    });

    // Build the task list in declaration order, then topologically sort
    // with a stable tie-break so forward feature references land correctly.
    let mut tasks: Vec<FileTask> = Vec::new();

    let manifest = FileTask::new(&manifest_path, FileKind::Manifest, name, retry_max);
    tasks.push(manifest);

    let mut main_task = FileTask::new(&main_path, FileKind::MainClass, &main_class, retry_max);
    main_task.depends_on = vec![manifest_path.clone()];
    tasks.push(main_task);

    for group in &feature_tasks {
        let mut task = FileTask::new(&group.path, FileKind::Feature, &group.class, retry_max);
        task.features = group
            .members
            .iter()
            .map(|&m| spec.features[m].clone())
            .collect();
        task.depends_on = group.deps.clone();
        tasks.push(task);
    }

    if let Some(feature_idx) = config_dep {
        let dep_path = feature_tasks[group_of[feature_idx]].path.clone();
        let mut task = FileTask::new("config.yml", FileKind::Config, "config.yml", retry_max);
        task.depends_on = vec![dep_path];
        tasks.push(task);
    }

    Ok(Plan {
        tasks: stable_toposort(tasks),
    })
}

// ---------------------------------------------------------------------------
// Cycle merging (Kosaraju SCC, iterative)
// ---------------------------------------------------------------------------

/// Group feature indices into strongly connected components, returned in
/// earliest-member order with members in declaration order.
fn feature_groups(n: usize, deps: &[Vec<usize>]) -> Vec<Vec<usize>> {
    if n == 0 {
        return Vec::new();
    }

    // Forward graph: dep -> dependent (edge direction does not matter for
    // SCC membership as long as transpose matches).
    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    for start in 0..n {
        if visited[start] {
            continue;
        }
        // Iterative post-order DFS.
        let mut stack = vec![(start, 0usize)];
        visited[start] = true;
        while let Some(&mut (node, ref mut edge)) = stack.last_mut() {
            if *edge < deps[node].len() {
                let next = deps[node][*edge];
                *edge += 1;
                if !visited[next] {
                    visited[next] = true;
                    stack.push((next, 0));
                }
            } else {
                order.push(node);
                stack.pop();
            }
        }
    }

    // Transpose.
    let mut rev: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, targets) in deps.iter().enumerate() {
        for &j in targets {
            rev[j].push(i);
        }
    }

    let mut component = vec![usize::MAX; n];
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &start in order.iter().rev() {
        if component[start] != usize::MAX {
            continue;
        }
        let id = groups.len();
        let mut members = Vec::new();
        let mut stack = vec![start];
        component[start] = id;
        while let Some(node) = stack.pop() {
            members.push(node);
            for &next in &rev[node] {
                if component[next] == usize::MAX {
                    component[next] = id;
                    stack.push(next);
                }
            }
        }
        members.sort_unstable();
        groups.push(members);
    }

    groups.sort_by_key(|members| members[0]);
    groups
}

// ---------------------------------------------------------------------------
// Deterministic ordering
// ---------------------------------------------------------------------------

/// Kahn's algorithm with a stable tie-break: among ready tasks, pick the
/// one earliest in construction order (declaration order), then by path.
/// The input graph is acyclic by construction (cycles were merged).
fn stable_toposort(tasks: Vec<FileTask>) -> Vec<FileTask> {
    let n = tasks.len();
    let index_of: BTreeMap<String, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.path.clone(), i))
        .collect();

    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, task) in tasks.iter().enumerate() {
        for dep in &task.depends_on {
            if let Some(&d) = index_of.get(dep) {
                dependents[d].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut placed = vec![false; n];
    let mut result_order = Vec::with_capacity(n);
    for _ in 0..n {
        let next = (0..n)
            .filter(|&i| !placed[i] && in_degree[i] == 0)
            .min_by(|&a, &b| a.cmp(&b).then_with(|| tasks[a].path.cmp(&tasks[b].path)));
        let Some(next) = next else {
            // Unreachable for merged plans; keep remaining declaration order.
            for i in 0..n {
                if !placed[i] {
                    result_order.push(i);
                }
            }
            break;
        };
        placed[next] = true;
        for &dep in &dependents[next] {
            in_degree[dep] -= 1;
        }
        result_order.push(next);
    }

    let mut slots: Vec<Option<FileTask>> = tasks.into_iter().map(Some).collect();
    result_order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
