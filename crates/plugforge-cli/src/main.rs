mod config;
mod generate_cmd;
mod plan_cmd;
mod report;
mod spec_file;

use std::path::Path;

use anyhow::bail;
use clap::{Parser, Subcommand};

use config::PlugforgeConfig;

#[derive(Parser)]
#[command(name = "plugforge", about = "Incremental plugin project generator")]
struct Cli {
    /// Backend command (overrides PLUGFORGE_BACKEND env var and config file)
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Show the derived file plan for a spec without generating
    Plan {
        /// Path to the spec TOML file
        file: String,
    },
    /// Run a generation session for a spec
    Generate {
        /// Path to the spec TOML file
        file: String,
        /// Output directory for generated files
        #[arg(long, default_value = "out")]
        output: String,
        /// Maximum generation attempts per file
        #[arg(long)]
        retry_max: Option<u32>,
        /// Maximum concurrent generation attempts
        #[arg(long)]
        max_concurrent: Option<usize>,
        /// Timeout per attempt in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute the `plugforge init` command: write the default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::default();
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  backend.command = {}", cfg.backend.command);
    println!("  backend.args = {:?}", cfg.backend.args);
    println!();
    println!("Next: write a spec TOML and run `plugforge generate <spec>`.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => cmd_init(force),
        Commands::Plan { file } => {
            let config = PlugforgeConfig::resolve(cli.backend.as_deref())?;
            plan_cmd::run_plan(Path::new(&file), config.session.retry_max)
        }
        Commands::Generate {
            file,
            output,
            retry_max,
            max_concurrent,
            timeout,
            json,
        } => {
            let config = PlugforgeConfig::resolve(cli.backend.as_deref())?;
            let options = generate_cmd::GenerateOptions {
                output,
                retry_max,
                max_concurrent,
                timeout_secs: timeout,
                json,
            };
            let success = generate_cmd::run_generate(Path::new(&file), &options, &config).await?;
            if !success {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
