//! Concurrent static-tier fetch over a set of identifiers

use crate::extractor::{Identifier, SongExtractor, SongRecord};
use crate::utils::config::ExtractorSettings;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fans a batch out over one extractor with bounded concurrency
pub struct BatchOrchestrator {
    extractor: Arc<dyn SongExtractor>,
    settings: Arc<ExtractorSettings>,
}

impl BatchOrchestrator {
    pub fn new(extractor: Arc<dyn SongExtractor>, settings: Arc<ExtractorSettings>) -> Self {
        Self {
            extractor,
            settings,
        }
    }

    /// Fetch every identifier. The map has exactly one entry per distinct
    /// input; a failed item gets its fallback record.
    pub async fn fetch_all(&self, ids: &[Identifier]) -> HashMap<Identifier, SongRecord> {
        let mut seen = HashSet::new();
        let unique: Vec<Identifier> = ids
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        info!(
            "Batch fetching {} identifiers ({} distinct) via {}",
            ids.len(),
            unique.len(),
            self.extractor.id()
        );

        let concurrency = self.settings.max_concurrent.max(1);
        let results: Vec<(Identifier, SongRecord)> = stream::iter(unique)
            .map(|id| {
                let extractor = Arc::clone(&self.extractor);
                let settings = Arc::clone(&self.settings);
                async move {
                    let record = match extractor.extract_song(&id).await {
                        Ok(record) => record,
                        Err(e) => {
                            warn!("Extraction failed for {}, using defaults: {}", id, e);
                            SongRecord::fallback(&id, &settings)
                        }
                    };
                    (id, record)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        debug!("Batch finished with {} records", results.len());
        results.into_iter().collect()
    }
}
