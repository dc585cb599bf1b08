//! Project specification types -- the immutable input to a generation session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ProjectSpec
// ---------------------------------------------------------------------------

/// A project specification: what plugin to generate and how.
///
/// Immutable once a session starts. The plan builder validates that `name`
/// and `prompt` are non-empty before any generation happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Project name (becomes the plugin name and the main class stem).
    pub name: String,
    /// Optional short alias for the project.
    #[serde(default)]
    pub alias: Option<String>,
    /// Free-text description of the plugin to generate.
    pub prompt: String,
    /// Ordered feature descriptions. Order is significant: it drives the
    /// deterministic generation order.
    #[serde(default)]
    pub features: Vec<String>,
    /// Incremental mode: supply the full content of all previously
    /// generated files as context to each generation step.
    #[serde(default = "default_true")]
    pub incremental: bool,
    /// Agent mode: include the prior failed attempt's issues in retry
    /// prompts so the backend can self-correct.
    #[serde(default = "default_true")]
    pub use_agents: bool,
    /// Owning user identifier.
    #[serde(default)]
    pub owner: String,
}

fn default_true() -> bool {
    true
}

impl ProjectSpec {
    /// Create a spec with the required fields; flags default to enabled.
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            prompt: prompt.into(),
            features: Vec::new(),
            incremental: true,
            use_agents: true,
            owner: String::new(),
        }
    }

    /// Set the feature list.
    pub fn features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    /// Set incremental mode.
    pub fn incremental(mut self, on: bool) -> Self {
        self.incremental = on;
        self
    }

    /// Set agent mode.
    pub fn use_agents(mut self, on: bool) -> Self {
        self.use_agents = on;
        self
    }

    /// Set the owning user identifier.
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

// ---------------------------------------------------------------------------
// FileKind
// ---------------------------------------------------------------------------

/// Kind tag for a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Manifest,
    MainClass,
    Feature,
    Config,
    Resource,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Manifest => "manifest",
            Self::MainClass => "main_class",
            Self::Feature => "feature",
            Self::Config => "config",
            Self::Resource => "resource",
        };
        f.write_str(s)
    }
}

impl FromStr for FileKind {
    type Err = FileKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manifest" => Ok(Self::Manifest),
            "main_class" => Ok(Self::MainClass),
            "feature" => Ok(Self::Feature),
            "config" => Ok(Self::Config),
            "resource" => Ok(Self::Resource),
            other => Err(FileKindParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`FileKind`] string.
#[derive(Debug, Clone)]
pub struct FileKindParseError(pub String);

impl fmt::Display for FileKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid file kind: {:?}", self.0)
    }
}

impl std::error::Error for FileKindParseError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
