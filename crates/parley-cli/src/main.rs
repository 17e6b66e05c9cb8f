//! # parley
//!
//! Batch transcription with speaker attribution over sidecar results.

#![deny(unsafe_code)]

mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use parley_pipeline::ProcessOptions;
use parley_pipeline::sidecar::sidecar_pipeline;
use parley_settings::ParleySettings;

use crate::output::Format;

/// Speaker-attributed transcription.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Speaker-attributed transcription")]
struct Cli {
    /// Settings file (defaults to `~/.parley/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level (overrides settings; `RUST_LOG` wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transcribe and diarize audio files.
    Process(ProcessArgs),
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Audio files to process.
    #[arg(required = true)]
    audio: Vec<PathBuf>,

    /// Skip speaker diarization.
    #[arg(long)]
    no_diarization: bool,

    /// Run diarization after transcription instead of concurrently.
    #[arg(long)]
    sequential: bool,

    /// Exact number of speakers.
    #[arg(long)]
    num_speakers: Option<u32>,

    /// Maximum files processed at once.
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Per-stage timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Transcription language code.
    #[arg(long)]
    language: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Write `<stem>.<ext>` files here instead of printing. Inputs must
    /// have distinct file stems.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl ProcessArgs {
    /// Settings-derived options with command-line overrides applied.
    fn options(&self, settings: &ParleySettings) -> ProcessOptions {
        let mut options = ProcessOptions::from(settings);
        if self.no_diarization {
            options.enable_diarization = false;
        }
        if self.sequential {
            options.parallel = false;
        }
        if let Some(n) = self.num_speakers {
            options.hints.num_speakers = Some(n);
        }
        if let Some(ms) = self.timeout_ms {
            options.stage_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(language) = &self.language {
            options.transcribe.language = Some(language.clone());
        }
        options
    }

    fn max_concurrent(&self, settings: &ParleySettings) -> usize {
        self.max_concurrent
            .unwrap_or(settings.pipeline.max_concurrent)
            .max(1)
    }
}

fn load_settings(cli: &Cli) -> Result<ParleySettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(parley_settings::settings_path);
    let mut settings = parley_settings::load_settings_from_path(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    if cli.json_logs {
        settings.logging.json = true;
    }
    Ok(settings)
}

async fn run_process(settings: &ParleySettings, args: &ProcessArgs) -> Result<ExitCode> {
    let options = args.options(settings);
    let max_concurrent = args.max_concurrent(settings);

    if let Some(dir) = &args.output_dir {
        output::ensure_distinct_outputs(&args.audio, args.format)?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let pipeline = sidecar_pipeline(settings).context("invalid capability settings")?;
    tracing::info!(
        inputs = args.audio.len(),
        diarization = options.enable_diarization && pipeline.has_diarizer(),
        max_concurrent,
        "processing"
    );
    let inputs = &args.audio;
    let options = &options;
    let outcome = pipeline
        .scoped(|p| async move { p.process_batch(inputs, max_concurrent, options).await })
        .await
        .context("failed to load capabilities")?;

    for failure in &outcome.failures {
        eprintln!("error: {}: {}", failure.audio_ref.display(), failure.error);
    }

    for transcript in &outcome.transcripts {
        match &args.output_dir {
            Some(dir) => {
                let path = output::write_to_dir(dir, transcript, args.format)?;
                tracing::info!(path = %path.display(), "saved");
            }
            None => println!("{}", output::render(transcript, args.format)?),
        }
    }

    tracing::info!(
        succeeded = outcome.succeeded(),
        failed = outcome.failed(),
        "done"
    );
    Ok(if outcome.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    parley_logging::init_from_settings(&settings.logging);

    match &cli.command {
        Command::Process(args) => run_process(&settings, args).await,
    }
}
