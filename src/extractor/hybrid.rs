use crate::extractor::identifier::Identifier;
use crate::extractor::models::SongRecord;
use crate::extractor::traits::SongExtractor;
use crate::utils::config::ExtractorSettings;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Which tiers a single-song extraction may use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Static tier only
    Fast,
    /// Static first, rendered when the static record is insufficient
    #[default]
    Auto,
    /// Rendered tier only
    GroundTruth,
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fast" => Ok(Self::Fast),
            "auto" => Ok(Self::Auto),
            "ground_truth" => Ok(Self::GroundTruth),
            other => Err(format!("unknown extraction mode: {}", other)),
        }
    }
}

/// The Hybrid Extractor
///
/// Routes a song request to the static tier, the rendered tier, or both,
/// according to the requested `ExtractionMode`.
pub struct HybridExtractor {
    fast: Arc<dyn SongExtractor>,
    thorough: Arc<dyn SongExtractor>,
    settings: Arc<ExtractorSettings>,
}

impl HybridExtractor {
    pub fn new(
        fast: Arc<dyn SongExtractor>,
        thorough: Arc<dyn SongExtractor>,
        settings: Arc<ExtractorSettings>,
    ) -> Self {
        Self {
            fast,
            thorough,
            settings,
        }
    }

    /// Extract one song using the tiers `mode` allows
    pub async fn extract_song(&self, id: &Identifier, mode: ExtractionMode) -> Result<SongRecord> {
        match mode {
            ExtractionMode::Fast => self.fast.extract_song(id).await,
            ExtractionMode::GroundTruth => self.thorough.extract_song(id).await,
            ExtractionMode::Auto => self.extract_auto(id).await,
        }
    }

    async fn extract_auto(&self, id: &Identifier) -> Result<SongRecord> {
        let fast_result = self.fast.extract_song(id).await;
        let fast_record = match fast_result {
            Ok(record) if !record.is_insufficient(&self.settings) => {
                debug!("{} satisfied {}", self.fast.id(), id);
                return Ok(record);
            }
            Ok(record) => Some(record),
            Err(e) => {
                info!("{} failed for {}: {}", self.fast.id(), id, e);
                None
            }
        };

        info!("Escalating {} to {}", id, self.thorough.id());
        match self.thorough.extract_song(id).await {
            Ok(record) => Ok(record),
            Err(e) => match fast_record {
                Some(record) => {
                    info!(
                        "{} failed for {}: {}. Keeping {} result",
                        self.thorough.id(),
                        id,
                        e,
                        self.fast.id()
                    );
                    Ok(record)
                }
                None => Err(e),
            },
        }
    }
}
