//! Command-line entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (defaults on first run).
//! 3. `config`: print or write the settings and exit.
//! 4. `replay`: build a tokio runtime, wire the replay camera/detector and
//!    the on-disk model assets into a [`SessionManager`], stream the
//!    recording through it, print the final text.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sign_to_text::{
    classifier::FileModelProvider,
    config::{AppConfig, AppPaths, CommitMode, PipelineKind},
    replay::{ReplayCamera, ReplayDetectorFactory},
    session::{Capabilities, SessionEvent, SessionManager},
};

#[derive(Parser)]
#[command(name = "sign-to-text", version, about = "Sign language to text")]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded landmark session (JSON Lines) through the pipeline
    Replay {
        #[arg(long, value_enum, default_value_t = PipelineArg::Spelling)]
        pipeline: PipelineArg,

        /// Commit mode; defaults to the configured one.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Recorded frames, one LandmarkFrame per line.
        #[arg(long)]
        frames: PathBuf,

        /// Directory holding `spelling/` and `phrases/` assets.
        #[arg(long)]
        models: Option<PathBuf>,
    },

    /// Print the effective settings as TOML
    Config {
        /// Also write them to the settings file.
        #[arg(long)]
        write: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PipelineArg {
    Spelling,
    Phrase,
}

impl From<PipelineArg> for PipelineKind {
    fn from(p: PipelineArg) -> Self {
        match p {
            PipelineArg::Spelling => PipelineKind::Spelling,
            PipelineArg::Phrase => PipelineKind::Phrase,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Free,
    Auto,
}

impl From<ModeArg> for CommitMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Free => CommitMode::FreeForm,
            ModeArg::Auto => CommitMode::AutoCommit,
        }
    }
}

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // 2. Configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };

    match cli.command {
        Command::Config { write } => {
            print!("{}", toml::to_string_pretty(&config)?);
            if write {
                let path = cli.config.unwrap_or_else(|| AppPaths::new().settings_file);
                config.save_to(&path)?;
                log::info!("settings written to {}", path.display());
            }
            Ok(())
        }
        Command::Replay {
            pipeline,
            mode,
            frames,
            models,
        } => {
            // 3. Tokio runtime (ticker + replay pacing)
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .context("failed to create tokio runtime")?;
            let models = models.unwrap_or_else(|| AppPaths::new().models_dir);
            rt.block_on(replay(config, pipeline.into(), mode.map(Into::into), frames, models))
        }
    }
}

async fn replay(
    mut config: AppConfig,
    pipeline: PipelineKind,
    mode: Option<CommitMode>,
    frames: PathBuf,
    models: PathBuf,
) -> Result<()> {
    if let Some(mode) = mode {
        config.default_mode = mode;
    }

    let detectors = Arc::new(
        ReplayDetectorFactory::from_file(&frames)
            .with_context(|| format!("failed to read {}", frames.display()))?,
    );
    log::info!(
        "replaying {} frame(s) through the {} pipeline ({:?})",
        detectors.frame_count(),
        pipeline.label(),
        config.default_mode
    );

    let capabilities = Capabilities::new()
        .with_camera(Arc::new(ReplayCamera))
        .with_detectors(detectors.clone())
        .with_models(Arc::new(FileModelProvider::new(models)));

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let manager = SessionManager::new(config, capabilities).with_events(event_tx);
    let finished = detectors.finished();

    manager.start(pipeline).await?;

    loop {
        tokio::select! {
            _ = finished.notified() => break,
            Some(event) = event_rx.recv() => log_event(&event),
        }
    }

    manager.stop();
    while let Ok(event) = event_rx.try_recv() {
        log_event(&event);
    }

    println!("{}", manager.text());
    Ok(())
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::Status(status) => log::info!("status: {}", status.label()),
        SessionEvent::Command(cmd) => log::info!("command: {}", cmd.label()),
        SessionEvent::Committed(text) => log::info!("committed: {text:?}"),
        SessionEvent::Hands(_) | SessionEvent::Prediction { .. } => {
            log::trace!("{event:?}")
        }
    }
}
