//! Sunoloader - song and playlist metadata extraction
//!
//! Command-line front end over the backend actor. Results are printed to
//! stdout as JSON; logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sunoloader::backend::{BackendActor, BackendCommand, BackendEvent};
use sunoloader::extractor::ExtractionMode;
use sunoloader::utils::ExtractorSettings;
use tokio::sync::mpsc;
use tracing::{debug, Level};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "sunoloader", version, about)]
struct Args {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a playlist's members (identifier or playlist URL)
    Playlist { reference: String },
    /// Fetch many songs concurrently through the static tier
    Batch {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Fetch songs one by one through the rendered tier, printing JSON lines
    Stream {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Fetch a single song
    Song {
        id: String,
        /// fast, auto or ground-truth
        #[arg(long, default_value = "auto")]
        mode: ExtractionMode,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let settings = match &args.config {
        Some(path) => ExtractorSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => ExtractorSettings::load_or_default().context("Failed to load settings")?,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(settings, args.command))
}

async fn run(settings: ExtractorSettings, command: Command) -> Result<()> {
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::channel(settings.stream_buffer.max(1));

    let actor = BackendActor::new(settings, cmd_rx, event_tx)?;
    let actor_task = tokio::spawn(actor.run());

    let (request_id, cmd) = match command {
        Command::Playlist { reference } => BackendCommand::enumerate_playlist(reference),
        Command::Batch { ids } => BackendCommand::batch_fetch(ids),
        Command::Stream { ids } => BackendCommand::stream_fetch(ids),
        Command::Song { id, mode } => BackendCommand::fetch_song(id, mode),
    };
    debug!("Dispatching request {}", request_id);
    cmd_tx.send(cmd).await.context("Backend stopped unexpectedly")?;

    let outcome = print_events(&mut event_rx, request_id).await;

    let _ = cmd_tx.send(BackendCommand::Shutdown).await;
    let _ = actor_task.await;
    outcome
}

async fn print_events(events: &mut mpsc::Receiver<BackendEvent>, request_id: Uuid) -> Result<()> {
    while let Some(event) = events.recv().await {
        if event.request_id() != request_id {
            continue;
        }
        let is_final = event.is_final();
        match event {
            BackendEvent::Error { message, .. } => bail!(message),
            BackendEvent::PlaylistEnumerated { playlist, .. } => {
                println!("{}", serde_json::to_string_pretty(&playlist)?);
            }
            BackendEvent::BatchCompleted {
                records, rejected, ..
            } => {
                for raw in &rejected {
                    eprintln!("Skipped malformed identifier: {}", raw);
                }
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            BackendEvent::SongFetched { record, .. } => {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            BackendEvent::Stream { event, .. } => {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        if is_final {
            return Ok(());
        }
    }
    bail!("Backend closed before request {} finished", request_id)
}
