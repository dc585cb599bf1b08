//! External-command generation backend.
//!
//! Spawns a configured CLI (by default `claude -p`), writes the prompt to
//! its stdin, and treats its stdout as the generated file content. The
//! session applies the attempt timeout around [`Generator::generate`].

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use super::trait_def::{GenerateError, GenerateRequest, Generator};

/// Default backend command.
pub const DEFAULT_COMMAND: &str = "claude";
/// Default backend arguments.
pub const DEFAULT_ARGS: &[&str] = &["-p"];

/// A [`Generator`] that shells out to an external command.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
}

impl Default for CommandGenerator {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_owned(),
            args: DEFAULT_ARGS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    fn name(&self) -> &str {
        "command"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, GenerateError> {
        debug!(
            path = %request.path,
            attempt = request.attempt,
            command = %self.command,
            "spawning generation backend"
        );

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GenerateError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // Write the prompt and close stdin so the backend sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.prompt.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        // Take stdout/stderr handles so we can read them concurrently with
        // waiting for the process. This avoids deadlocks if the child fills
        // the pipe buffer.
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stdout_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let (wait_result, stdout, stderr) = tokio::join!(child.wait(), read_stdout, read_stderr);
        let status = wait_result?;

        if !status.success() {
            let exit = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_owned());
            return Err(GenerateError::Backend {
                exit,
                stderr: stderr.trim().to_owned(),
            });
        }

        let content = strip_fences(&stdout);
        if content.trim().is_empty() {
            return Err(GenerateError::EmptyOutput);
        }
        Ok(content)
    }
}

/// Strip a single wrapping markdown code fence, if present. Backends are
/// told not to fence their output, but some do anyway.
fn strip_fences(output: &str) -> String {
    let trimmed = output.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return output.to_owned();
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return output.to_owned();
    };
    // Drop the language tag on the opening fence line.
    match inner.split_once('\n') {
        Some((_, body)) => body.to_owned(),
        None => inner.to_owned(),
    }
}
