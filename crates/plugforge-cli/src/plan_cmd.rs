//! `plugforge plan` command: show the derived file plan for a spec.

use std::path::Path;

use anyhow::Result;

use plugforge_core::plan::build_plan;

use crate::spec_file;

/// Print the ordered task plan without generating anything.
pub fn run_plan(spec_path: &Path, retry_max: u32) -> Result<()> {
    let spec = spec_file::load_spec(spec_path)?;
    let plan = build_plan(&spec, retry_max)?;

    println!("Plan for {} ({} files):", spec.name.trim(), plan.tasks.len());
    println!();
    for (i, task) in plan.tasks.iter().enumerate() {
        let deps = if task.depends_on.is_empty() {
            "-".to_owned()
        } else {
            task.depends_on.join(", ")
        };
        println!(
            "{:>3}. {:<40} {:<10} after: {}",
            i + 1,
            task.path,
            task.kind.to_string(),
            deps
        );
        for feature in &task.features {
            println!("     - {}", feature.trim());
        }
    }
    Ok(())
}
