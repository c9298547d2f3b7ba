//! CLI command implementations

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use swara::{FrameCapture, Transcriber};
use swara_store::{adopt_existing, persist_csv, spawn_sweep_task, ArtifactStore, TtlArtifactStore};
use swaraconf::{ConfigSources, SwaraConfig};
use tokio_util::sync::CancellationToken;

use crate::render::{render, Format};

#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Frame capture JSON file, or "-" for stdin
    capture: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Search threads (overrides config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Search time budget in milliseconds (overrides config)
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Also save the CSV in the artifact directory
    #[arg(long)]
    store: bool,

    /// Artifact id used with --store (default: random UUID)
    #[arg(long, requires = "store")]
    id: Option<String>,
}

fn read_capture(path: &Path) -> Result<FrameCapture> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read capture from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read capture {}", path.display()))?
    };

    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse capture {}", path.display()))
}

/// Run the pipeline on one capture and emit the result.
pub async fn transcribe(mut config: SwaraConfig, args: TranscribeArgs) -> Result<()> {
    if let Some(workers) = args.workers {
        config.search.workers = workers;
    }
    if let Some(ms) = args.deadline_ms {
        config.search.deadline_ms = Some(ms);
    }
    config.validate().context("Invalid search settings")?;

    let capture = read_capture(&args.capture)?;

    let mut transcriber = Transcriber::new(config.quantize)
        .context("Invalid quantizer policy")?
        .with_workers(config.search.workers);
    if let Some(deadline) = config.deadline() {
        transcriber = transcriber.with_deadline(deadline);
    }

    // The search is CPU-bound; keep it off the async workers.
    let transcription =
        tokio::task::spawn_blocking(move || transcriber.transcribe_capture(&capture))
            .await
            .context("Transcription task panicked")?
            .with_context(|| format!("Failed to transcribe {}", args.capture.display()))?;

    let rendered = render(&transcription, args.format)?;
    match &args.output {
        Some(path) => std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rendered).context("Failed to write output")?;
            stdout.flush().context("Failed to write output")?;
        }
    }

    if args.store {
        let store = TtlArtifactStore::new_shared(config.artifact_ttl());

        // Tables from earlier runs age from their mtime; expire them first.
        adopt_existing(store.as_ref(), &config.store.artifact_dir)
            .context("Failed to scan artifact directory")?;
        let evicted = store.sweep();
        if evicted > 0 {
            tracing::info!(evicted, "Removed expired note tables");
        }

        let cancel = CancellationToken::new();
        let sweeper = spawn_sweep_task(store.clone(), config.sweep_interval(), cancel.clone());

        let artifact = persist_csv(
            store.as_ref(),
            &config.store.artifact_dir,
            args.id.as_deref().unwrap_or(""),
            &transcription,
        )
        .context("Failed to store note table")?;
        eprintln!("Stored {} at {}", artifact.id, artifact.path.display());

        cancel.cancel();
        sweeper.await.context("Artifact sweep task panicked")?;
    }

    Ok(())
}

/// Print the effective configuration, noting where it came from.
pub fn show_config(config: &SwaraConfig, sources: &ConfigSources) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    if sources.files.is_empty() {
        writeln!(stdout, "# sources: compiled defaults")?;
    }
    for path in &sources.files {
        writeln!(stdout, "# file: {}", path.display())?;
    }
    for var in &sources.env_overrides {
        writeln!(stdout, "# env: {}", var)?;
    }

    write!(stdout, "{}", config.to_toml())?;
    Ok(())
}
