use super::messages::{BackendCommand, BackendEvent};
use crate::extractor::identifier::{parse_many, Identifier};
use crate::extractor::{
    ExtractionMode, HybridExtractor, PlaylistEnumerator, RenderedExtractor, SongExtractor,
    StaticExtractor,
};
use crate::fetcher::{HttpFetcher, PageFetcher};
use crate::queue::{BatchOrchestrator, StreamingOrchestrator};
use crate::render::{ChromiumEngine, RenderEngine};
use crate::utils::config::ExtractorSettings;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Extraction components shared by every request
#[derive(Clone)]
struct Services {
    enumerator: Arc<PlaylistEnumerator>,
    batch: Arc<BatchOrchestrator>,
    streamer: Arc<StreamingOrchestrator>,
    hybrid: Arc<HybridExtractor>,
}

pub struct BackendActor {
    receiver: mpsc::Receiver<BackendCommand>,
    sender: mpsc::Sender<BackendEvent>,
    services: Services,
}

impl BackendActor {
    /// Build the actor over plain HTTP and a local Chromium
    pub fn new(
        settings: ExtractorSettings,
        receiver: mpsc::Receiver<BackendCommand>,
        sender: mpsc::Sender<BackendEvent>,
    ) -> Result<Self> {
        let settings = Arc::new(settings.validated());
        let fetcher: Arc<dyn PageFetcher> =
            Arc::new(HttpFetcher::new(&settings).context("Failed to build HTTP client")?);
        let engine: Arc<dyn RenderEngine> = Arc::new(ChromiumEngine::new(Arc::clone(&settings)));
        Ok(Self::with_components(fetcher, engine, settings, receiver, sender))
    }

    /// Build the actor over caller-supplied fetcher and engine
    pub fn with_components(
        fetcher: Arc<dyn PageFetcher>,
        engine: Arc<dyn RenderEngine>,
        settings: Arc<ExtractorSettings>,
        receiver: mpsc::Receiver<BackendCommand>,
        sender: mpsc::Sender<BackendEvent>,
    ) -> Self {
        let static_tier: Arc<dyn SongExtractor> =
            Arc::new(StaticExtractor::new(fetcher, Arc::clone(&settings)));
        let rendered_tier: Arc<dyn SongExtractor> = Arc::new(RenderedExtractor::new(
            Arc::clone(&engine),
            Arc::clone(&settings),
        ));

        let services = Services {
            enumerator: Arc::new(PlaylistEnumerator::new(
                Arc::clone(&engine),
                Arc::clone(&settings),
            )),
            batch: Arc::new(BatchOrchestrator::new(
                Arc::clone(&static_tier),
                Arc::clone(&settings),
            )),
            streamer: Arc::new(StreamingOrchestrator::new(engine, Arc::clone(&settings))),
            hybrid: Arc::new(HybridExtractor::new(static_tier, rendered_tier, settings)),
        };

        Self {
            receiver,
            sender,
            services,
        }
    }

    /// Serve commands until `Shutdown` or until every command sender is gone.
    /// Each request runs on its own task so a slow playlist does not hold up
    /// a batch behind it.
    pub async fn run(mut self) {
        info!("BackendActor started");

        while let Some(cmd) = self.receiver.recv().await {
            let services = self.services.clone();
            let sender = self.sender.clone();
            match cmd {
                BackendCommand::EnumeratePlaylist {
                    request_id,
                    reference,
                } => {
                    tokio::spawn(async move {
                        Self::handle_enumerate(services, sender, request_id, reference).await;
                    });
                }
                BackendCommand::BatchFetch { request_id, ids } => {
                    tokio::spawn(async move {
                        Self::handle_batch(services, sender, request_id, ids).await;
                    });
                }
                BackendCommand::StreamFetch { request_id, ids } => {
                    tokio::spawn(async move {
                        Self::handle_stream(services, sender, request_id, ids).await;
                    });
                }
                BackendCommand::FetchSong {
                    request_id,
                    id,
                    mode,
                } => {
                    tokio::spawn(async move {
                        Self::handle_fetch_song(services, sender, request_id, id, mode).await;
                    });
                }
                BackendCommand::Shutdown => {
                    info!("BackendActor shutting down");
                    break;
                }
            }
        }
    }

    async fn handle_enumerate(
        services: Services,
        sender: mpsc::Sender<BackendEvent>,
        request_id: Uuid,
        reference: String,
    ) {
        let event = match services.enumerator.enumerate(&reference).await {
            Ok(playlist) => BackendEvent::PlaylistEnumerated {
                request_id,
                playlist,
            },
            Err(e) => {
                warn!("Playlist request {} failed: {}", request_id, e);
                BackendEvent::Error {
                    request_id,
                    message: e.to_string(),
                }
            }
        };
        let _ = sender.send(event).await;
    }

    async fn handle_batch(
        services: Services,
        sender: mpsc::Sender<BackendEvent>,
        request_id: Uuid,
        ids: Vec<String>,
    ) {
        let (valid, rejected) = parse_many(&ids);
        if !rejected.is_empty() {
            warn!(
                "Batch {} rejected {} malformed identifiers",
                request_id,
                rejected.len()
            );
        }
        let records = services.batch.fetch_all(&valid).await;
        let _ = sender
            .send(BackendEvent::BatchCompleted {
                request_id,
                records,
                rejected,
            })
            .await;
    }

    async fn handle_stream(
        services: Services,
        sender: mpsc::Sender<BackendEvent>,
        request_id: Uuid,
        ids: Vec<String>,
    ) {
        let (valid, rejected) = parse_many(&ids);
        for raw in &rejected {
            warn!("Stream {} skipping malformed identifier {:?}", request_id, raw);
        }

        let mut events = services.streamer.stream(valid);
        while let Some(event) = events.recv().await {
            let terminal = event.is_terminal();
            if sender
                .send(BackendEvent::Stream { request_id, event })
                .await
                .is_err()
            {
                // dropping `events` stops the producer
                debug!("Event receiver closed, abandoning stream {}", request_id);
                return;
            }
            if terminal {
                break;
            }
        }
    }

    async fn handle_fetch_song(
        services: Services,
        sender: mpsc::Sender<BackendEvent>,
        request_id: Uuid,
        id: String,
        mode: ExtractionMode,
    ) {
        let event = match Identifier::parse(&id) {
            None => BackendEvent::Error {
                request_id,
                message: format!("Invalid reference: {}", id),
            },
            Some(id) => match services.hybrid.extract_song(&id, mode).await {
                Ok(record) => BackendEvent::SongFetched { request_id, record },
                Err(e) => BackendEvent::Error {
                    request_id,
                    message: e.to_string(),
                },
            },
        };
        let _ = sender.send(event).await;
    }
}
