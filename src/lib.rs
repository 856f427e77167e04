//! Sunoloader library
//!
//! Song and playlist metadata extraction in two tiers: a fast static pass
//! over raw HTML and a slower rendered pass through a headless browser.

pub mod backend;
pub mod extractor;
pub mod fetcher;
pub mod queue;
pub mod render;
pub mod utils;

// Re-export main types for easier use
pub use backend::{BackendActor, BackendCommand, BackendEvent};
pub use extractor::{
    ExtractionMode, ExtractionTier, HybridExtractor, Identifier, PlaylistEnumerator,
    PlaylistRecord, SongRecord,
};
pub use queue::{BatchOrchestrator, MergedResults, StreamEvent, StreamingOrchestrator};
pub use utils::{ExtractorSettings, SunoloaderError};
