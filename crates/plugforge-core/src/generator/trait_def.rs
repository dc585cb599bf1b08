//! The `Generator` trait -- the adapter interface for generation backends.
//!
//! Each concrete backend (external CLI, scripted test double, etc.)
//! implements this trait. The trait is intentionally object-safe so it can
//! be stored as `Box<dyn Generator>` in the [`super::GeneratorRegistry`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::spec::FileKind;

/// Everything a backend needs to produce one file, frozen at spawn time.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub task_id: Uuid,
    /// Target path within the generated project.
    pub path: String,
    pub kind: FileKind,
    /// The symbol the produced file is expected to declare.
    pub expected_symbol: String,
    /// 1-based attempt number for this request.
    pub attempt: u32,
    /// The fully materialized prompt, including project context and any
    /// retry feedback.
    pub prompt: String,
}

/// Errors from a single generation attempt.
///
/// All variants are retryable from the session's point of view; the retry
/// budget decides when to stop.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to spawn backend `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backend timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("backend produced no output")]
    EmptyOutput,

    #[error("backend exited with {exit}: {stderr}")]
    Backend { exit: String, stderr: String },

    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Adapter interface for file-content generation backends.
///
/// # Object Safety
///
/// This trait is object-safe: it can be stored as `Box<dyn Generator>` in
/// collections such as [`super::GeneratorRegistry`].
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable name for this backend (e.g. "command").
    fn name(&self) -> &str;

    /// Produce the content for one file.
    ///
    /// Returns the raw text; the caller validates it. Implementations
    /// should not apply their own retry logic.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, GenerateError>;
}

// Compile-time assertion: Generator must be object-safe.
// If this line compiles, the trait can be used as `dyn Generator`.
const _: () = {
    fn _assert_object_safe(_: &dyn Generator) {}
};

/// Shared backends delegate through the `Arc`, so a caller can register a
/// generator and keep a handle to it (e.g. to inspect recorded prompts).
#[async_trait]
impl<T> Generator for std::sync::Arc<T>
where
    T: Generator + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, GenerateError> {
        (**self).generate(request).await
    }
}
