//! Sequential rendered-tier extraction over one shared session

use crate::extractor::rendered::extract_in_session;
use crate::extractor::{Identifier, SongRecord};
use crate::queue::events::StreamEvent;
use crate::render::{RenderEngine, RenderedPageSession};
use crate::utils::config::ExtractorSettings;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Streams rendered records one identifier at a time
pub struct StreamingOrchestrator {
    engine: Arc<dyn RenderEngine>,
    settings: Arc<ExtractorSettings>,
}

impl StreamingOrchestrator {
    pub fn new(engine: Arc<dyn RenderEngine>, settings: Arc<ExtractorSettings>) -> Self {
        Self { engine, settings }
    }

    /// Start streaming `ids` in order.
    ///
    /// The receiver yields one `Song` event per input identifier followed by
    /// `Complete`, or an `Error` if the session dies. Dropping the receiver
    /// stops the producer and tears the session down.
    pub fn stream(&self, ids: Vec<Identifier>) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.settings.stream_buffer.max(1));
        let engine = Arc::clone(&self.engine);
        let settings = Arc::clone(&self.settings);
        tokio::spawn(async move {
            run_stream(engine, settings, ids, tx).await;
        });
        rx
    }
}

async fn run_stream(
    engine: Arc<dyn RenderEngine>,
    settings: Arc<ExtractorSettings>,
    ids: Vec<Identifier>,
    tx: mpsc::Sender<StreamEvent>,
) {
    info!("Streaming {} identifiers", ids.len());

    let mut session = match RenderedPageSession::open(engine.as_ref(), Arc::clone(&settings)).await
    {
        Ok(session) => session,
        Err(e) => {
            error!("Could not start rendering session: {}", e);
            let _ = tx.send(StreamEvent::error(e.to_string())).await;
            return;
        }
    };

    let mut emitted = 0usize;
    let mut terminal = None;
    for id in &ids {
        let record = match extract_in_session(&session, id, &settings).await {
            Ok(record) => record,
            Err(e) if e.is_session_fatal() => {
                error!("Session lost while extracting {}: {}", id, e);
                terminal = Some(StreamEvent::error(e.to_string()));
                break;
            }
            Err(e) => {
                warn!("Extraction failed for {}, emitting defaults: {}", id, e);
                SongRecord::fallback(id, &settings)
            }
        };

        if tx.send(StreamEvent::song(record)).await.is_err() {
            info!("Stream subscriber went away after {} events", emitted);
            break;
        }
        emitted += 1;
    }

    if let Err(e) = session.close().await {
        warn!("Failed to close streaming session: {}", e);
    }

    let last = match terminal {
        Some(event) => event,
        None if emitted == ids.len() => StreamEvent::complete(emitted),
        // subscriber dropped
        None => return,
    };
    if tx.send(last).await.is_err() {
        debug!("Stream subscriber gone before the final event");
    }
}
