//! `plugforge generate` command: run a generation session for a spec file.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use plugforge_core::generator::{CommandGenerator, GeneratorRegistry};
use plugforge_core::session::{SessionConfig, SessionResult, run_session};

use crate::config::PlugforgeConfig;
use crate::report;
use crate::spec_file;

pub struct GenerateOptions {
    pub output: String,
    pub retry_max: Option<u32>,
    pub max_concurrent: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub json: bool,
}

/// Run the generate command. Returns whether the session succeeded.
pub async fn run_generate(
    spec_path: &Path,
    options: &GenerateOptions,
    config: &PlugforgeConfig,
) -> Result<bool> {
    let spec = spec_file::load_spec(spec_path)?;
    info!(
        project = %spec.name.trim(),
        backend = %config.backend_command,
        "starting generation session"
    );

    let session_config = SessionConfig {
        retry_max: options.retry_max.unwrap_or(config.session.retry_max),
        max_concurrent: options
            .max_concurrent
            .unwrap_or(config.session.max_concurrent),
        task_timeout: Duration::from_secs(
            options.timeout_secs.unwrap_or(config.session.timeout_secs),
        ),
    };

    let mut registry = GeneratorRegistry::new();
    registry.register(CommandGenerator::new(
        &config.backend_command,
        config.backend_args.clone(),
    ));
    let registry = Arc::new(registry);

    // Graceful shutdown: first signal cancels, second force-exits.
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let got_first_signal = Arc::new(AtomicBool::new(false));
    let got_first_clone = Arc::clone(&got_first_signal);

    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.ok();
            if got_first_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce exit.");
                std::process::exit(130);
            }
            eprintln!("\nShutting down gracefully (Ctrl+C again to force)...");
            cancel_clone.cancel();
        }
    });

    let result = run_session(&spec, &registry, "command", &session_config, cancel).await?;

    write_output(&result, Path::new(&options.output))?;

    if options.json {
        report::print_json(&result)?;
    } else {
        report::print_table(&result);
        println!("wrote {} file(s) to {}", result.files.len(), options.output);
    }

    Ok(result.success)
}

/// Write every completed file under the output directory.
fn write_output(result: &SessionResult, output_dir: &Path) -> Result<()> {
    if result.files.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;
    for file in &result.files {
        let path = output_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, &file.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}
