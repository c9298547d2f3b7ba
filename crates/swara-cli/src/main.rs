//! swara - quantize a captured pitch track into timed scale-degree notes
//!
//! Subcommands:
//! - `swara transcribe <capture.json>` - run the grid search and print the notes
//! - `swara config` - print the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use swaraconf::SwaraConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "swara")]
#[command(about = "Quantize sung pitch tracks into scale-degree notes and rests")]
#[command(version)]
struct Cli {
    /// Config file, loaded in place of ./swara.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe a frame capture (JSON with pitch and confidence arrays)
    Transcribe(commands::TranscribeArgs),

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = SwaraConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.telemetry.log_level);
    tracing::debug!(
        files = ?sources.files,
        env_overrides = ?sources.env_overrides,
        "Loaded configuration"
    );

    match cli.command {
        Commands::Transcribe(args) => commands::transcribe(config, args).await?,
        Commands::Config => commands::show_config(&config, &sources)?,
    }

    Ok(())
}
