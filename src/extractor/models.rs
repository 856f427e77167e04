//! Data structures for song and playlist records

use crate::extractor::identifier::Identifier;
use crate::utils::config::ExtractorSettings;
use serde::{Deserialize, Serialize};

/// Which tier produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    /// Raw HTML / embedded JSON
    Static,
    /// Rendered DOM
    Rendered,
    /// All-default record produced by absorbing a failure
    Fallback,
}

/// Song metadata. Every field is independently optional or defaulted;
/// a record is never rejected for missing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    pub id: Identifier,
    pub title: Option<String>,
    pub artist: String,
    /// Never empty: a discovered URL or the derived CDN fallback
    pub cover_url: String,
    pub style: Option<String>,
    pub description: Option<String>,
    pub tier: ExtractionTier,
}

impl SongRecord {
    /// The field-default record for an identifier
    pub fn fallback(id: &Identifier, settings: &ExtractorSettings) -> Self {
        Self {
            id: id.clone(),
            title: None,
            artist: settings.unknown_artist.clone(),
            cover_url: settings.fallback_cover_url(id.as_str()),
            style: None,
            description: None,
            tier: ExtractionTier::Fallback,
        }
    }

    pub fn has_known_artist(&self, settings: &ExtractorSettings) -> bool {
        self.artist != settings.unknown_artist
    }

    /// Static results missing a title or artist are worth a rendered pass
    pub fn is_insufficient(&self, settings: &ExtractorSettings) -> bool {
        self.title.is_none() || !self.has_known_artist(settings)
    }
}

/// Playlist metadata with its members in discovery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub id: Identifier,
    pub title: String,
    pub description: Option<String>,
    pub creator_handle: Option<String>,
    pub members: Vec<Identifier>,
}

/// Raw per-field output of a heuristic pass, before defaults are applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongFields {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub cover_url: Option<String>,
    pub style: Option<String>,
    pub description: Option<String>,
}

impl SongFields {
    /// Apply field defaults and tag the record with its tier
    pub fn into_record(
        self,
        id: &Identifier,
        tier: ExtractionTier,
        settings: &ExtractorSettings,
    ) -> SongRecord {
        SongRecord {
            id: id.clone(),
            title: self.title,
            artist: self
                .artist
                .unwrap_or_else(|| settings.unknown_artist.clone()),
            cover_url: self
                .cover_url
                .unwrap_or_else(|| settings.fallback_cover_url(id.as_str())),
            style: self.style,
            description: self.description,
            tier,
        }
    }
}
