use crate::extractor::{ExtractionMode, Identifier, PlaylistRecord, SongRecord};
use crate::queue::StreamEvent;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Commands sent from the serving layer to the backend
#[derive(Debug, Clone)]
pub enum BackendCommand {
    EnumeratePlaylist {
        request_id: Uuid,
        reference: String,
    },
    BatchFetch {
        request_id: Uuid,
        ids: Vec<String>,
    },
    StreamFetch {
        request_id: Uuid,
        ids: Vec<String>,
    },
    FetchSong {
        request_id: Uuid,
        id: String,
        mode: ExtractionMode,
    },
    // System
    Shutdown,
}

impl BackendCommand {
    pub fn enumerate_playlist(reference: impl Into<String>) -> (Uuid, Self) {
        let request_id = Uuid::new_v4();
        (
            request_id,
            Self::EnumeratePlaylist {
                request_id,
                reference: reference.into(),
            },
        )
    }

    pub fn batch_fetch(ids: Vec<String>) -> (Uuid, Self) {
        let request_id = Uuid::new_v4();
        (request_id, Self::BatchFetch { request_id, ids })
    }

    pub fn stream_fetch(ids: Vec<String>) -> (Uuid, Self) {
        let request_id = Uuid::new_v4();
        (request_id, Self::StreamFetch { request_id, ids })
    }

    pub fn fetch_song(id: impl Into<String>, mode: ExtractionMode) -> (Uuid, Self) {
        let request_id = Uuid::new_v4();
        (
            request_id,
            Self::FetchSong {
                request_id,
                id: id.into(),
                mode,
            },
        )
    }
}

/// Events sent from the backend to the serving layer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendEvent {
    PlaylistEnumerated {
        request_id: Uuid,
        playlist: PlaylistRecord,
    },
    BatchCompleted {
        request_id: Uuid,
        records: HashMap<Identifier, SongRecord>,
        /// Inputs that were not identifiers
        rejected: Vec<String>,
    },
    SongFetched {
        request_id: Uuid,
        record: SongRecord,
    },
    Stream {
        request_id: Uuid,
        event: StreamEvent,
    },
    /// Request-level failure (bad reference, navigation timeout)
    Error {
        request_id: Uuid,
        message: String,
    },
}

impl BackendEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            Self::PlaylistEnumerated { request_id, .. }
            | Self::BatchCompleted { request_id, .. }
            | Self::SongFetched { request_id, .. }
            | Self::Stream { request_id, .. }
            | Self::Error { request_id, .. } => *request_id,
        }
    }

    /// Whether no further events will follow for this request
    pub fn is_final(&self) -> bool {
        match self {
            Self::Stream { event, .. } => event.is_terminal(),
            _ => true,
        }
    }
}
