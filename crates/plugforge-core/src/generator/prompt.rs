//! Prompt materialization.
//!
//! Produces the self-contained markdown prompt for one generation attempt:
//! project brief, target file, kind-specific guidelines, the accumulated
//! context of completed files, and feedback from the prior failed attempt
//! when agent mode is on.

use crate::context::ContextSnapshot;
use crate::spec::{FileKind, ProjectSpec};
use crate::task::FileTask;

const MANIFEST_GUIDELINES: &str = "\
- Produce a valid YAML plugin manifest.
- Include `name`, `version`, and `main` keys.
- `main` is the fully qualified main class name.
- Output only the file content, no fences or commentary.";

const CLASS_GUIDELINES: &str = "\
- Produce a single complete Java class.
- Declare exactly the expected class name, public, with balanced braces.
- Reference other project classes only if they appear in the plan.
- Output only the file content, no fences or commentary.";

const CONFIG_GUIDELINES: &str = "\
- Produce a valid YAML configuration file.
- Use sensible defaults for every setting the features mention.
- Output only the file content, no fences or commentary.";

const RESOURCE_GUIDELINES: &str = "\
- Produce the resource file content directly.
- Output only the file content, no fences or commentary.";

fn guidelines(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Manifest => MANIFEST_GUIDELINES,
        FileKind::MainClass | FileKind::Feature => CLASS_GUIDELINES,
        FileKind::Config => CONFIG_GUIDELINES,
        FileKind::Resource => RESOURCE_GUIDELINES,
    }
}

/// Materialize the prompt for one generation attempt.
///
/// The snapshot holds the completed-file context to include; callers pass
/// an empty snapshot in non-incremental mode. Feedback from the prior
/// attempt is included only when the spec has agent mode on.
pub fn build_file_prompt(spec: &ProjectSpec, task: &FileTask, snapshot: &ContextSnapshot) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Generate: {}\n\n", task.path));

    // Project brief
    out.push_str("## Project\n\n");
    out.push_str(&format!("**Name:** {}\n", spec.name.trim()));
    if let Some(alias) = &spec.alias {
        out.push_str(&format!("**Alias:** {alias}\n"));
    }
    out.push('\n');
    out.push_str(spec.prompt.trim());
    out.push_str("\n\n");

    // Target file
    out.push_str("## File\n\n");
    out.push_str(&format!("- **Path:** {}\n", task.path));
    out.push_str(&format!("- **Kind:** {}\n", task.kind));
    out.push_str(&format!("- **Declares:** {}\n", task.expected_symbol));
    out.push('\n');

    if !task.features.is_empty() {
        out.push_str("## Features\n\n");
        for feature in &task.features {
            out.push_str(&format!("- {}\n", feature.trim()));
        }
        out.push('\n');
    }

    out.push_str("## Guidelines\n\n");
    out.push_str(guidelines(task.kind));
    out.push_str("\n\n");

    // Accumulated context, in completion order.
    if !snapshot.is_empty() {
        out.push_str("## Existing Files\n\n");
        out.push_str("These files already exist in the project. Stay consistent with them.\n\n");
        for entry in snapshot.entries() {
            out.push_str(&format!("### {}\n\n```\n{}\n```\n\n", entry.path, entry.content.trim_end()));
        }
    }

    // Previous Attempt Feedback (retry context)
    if spec.use_agents && task.attempt > 0 && !task.last_issues.is_empty() {
        out.push_str("## Previous Attempt Feedback\n\n");
        out.push_str(
            "The previous attempt was rejected. Fix the following and regenerate the full file:\n\n",
        );
        for issue in &task.last_issues {
            out.push_str(&format!("- {issue}\n"));
        }
        out.push('\n');
    }

    out
}
