use crate::extractor::identifier::Identifier;
use crate::extractor::models::{ExtractionTier, SongRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Core trait for song metadata extractors
///
/// Isolates orchestration from how a tier obtains its page (plain HTTP or a
/// rendering engine).
#[async_trait]
pub trait SongExtractor: Send + Sync {
    /// Returns a unique identifier for this extractor (e.g., "static-html", "rendered-dom")
    fn id(&self) -> &'static str;

    /// The tier whose records this extractor produces
    fn tier(&self) -> ExtractionTier;

    /// Extract one song. Field misses are filled with defaults; only
    /// page-level failures (network, navigation) are returned as errors.
    async fn extract_song(&self, id: &Identifier) -> Result<SongRecord>;
}
