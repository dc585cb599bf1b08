//! Configuration file management for plugforge.
//!
//! Provides a TOML-based config file at `~/.config/plugforge/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use plugforge_core::generator::command::{DEFAULT_ARGS, DEFAULT_COMMAND};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendSection {
    /// Backend command to spawn for each generation attempt.
    pub command: String,
    /// Arguments passed before the prompt is piped to stdin.
    pub args: Vec<String>,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_owned(),
            args: DEFAULT_ARGS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSection {
    pub retry_max: u32,
    pub max_concurrent: usize,
    pub timeout_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            retry_max: 3,
            max_concurrent: 1,
            timeout_secs: 120,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the plugforge config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/plugforge` or
/// `~/.config/plugforge`. We intentionally ignore the platform-specific
/// `dirs::config_dir()` (which returns `~/Library/Application Support` on
/// macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("plugforge");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("plugforge")
}

/// Return the path to the plugforge config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // Set permissions to 0600 (owner read/write only) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct PlugforgeConfig {
    pub backend_command: String,
    pub backend_args: Vec<String>,
    pub session: SessionSection,
}

impl PlugforgeConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config
    /// file > default.
    ///
    /// - Backend command: `cli_backend` > `PLUGFORGE_BACKEND` env >
    ///   `config_file.backend.command` > `claude`
    /// - A CLI or env backend override clears the file's args.
    pub fn resolve(cli_backend: Option<&str>) -> Result<Self> {
        let file_config = load_config().unwrap_or_default();

        let (backend_command, backend_args) = if let Some(command) = cli_backend {
            (command.to_owned(), Vec::new())
        } else if let Ok(command) = std::env::var("PLUGFORGE_BACKEND") {
            (command, Vec::new())
        } else {
            (file_config.backend.command, file_config.backend.args)
        };

        Ok(Self {
            backend_command,
            backend_args,
            session: file_config.session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_claude() {
        let section = BackendSection::default();
        assert_eq!(section.command, "claude");
        assert_eq!(section.args, vec!["-p"]);
    }

    #[test]
    fn config_file_parses_with_partial_sections() {
        let parsed: ConfigFile = toml::from_str(
            r#"
[backend]
command = "codex"
args = ["exec"]
"#,
        )
        .expect("should parse");
        assert_eq!(parsed.backend.command, "codex");
        assert_eq!(parsed.session.retry_max, 3, "session section defaults");
    }
}
