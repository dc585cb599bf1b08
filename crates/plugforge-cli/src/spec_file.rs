//! Loading project specs from TOML files.

use std::path::Path;

use anyhow::{Context, Result};

use plugforge_core::spec::ProjectSpec;

/// Load a [`ProjectSpec`] from a TOML file.
pub fn load_spec(path: &Path) -> Result<ProjectSpec> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spec file at {}", path.display()))?;
    let spec: ProjectSpec = toml::from_str(&contents)
        .with_context(|| format!("failed to parse spec file at {}", path.display()))?;
    Ok(spec)
}
