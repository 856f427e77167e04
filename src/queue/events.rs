use crate::extractor::{Identifier, SongRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events pushed to a stream subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// One identifier finished (possibly as a fallback record)
    Song {
        identifier: Identifier,
        record: SongRecord,
        timestamp: DateTime<Utc>,
    },
    /// Every identifier was emitted
    Complete {
        emitted: usize,
        timestamp: DateTime<Utc>,
    },
    /// The session died; nothing further will be emitted
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl StreamEvent {
    pub fn song(record: SongRecord) -> Self {
        Self::Song {
            identifier: record.id.clone(),
            record,
            timestamp: Utc::now(),
        }
    }

    pub fn complete(emitted: usize) -> Self {
        Self::Complete {
            emitted,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Completion and error both end the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}
