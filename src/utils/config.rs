//! Extractor configuration
//!
//! Every constant the extractors depend on lives here so components stay
//! free of hidden globals. Settings are loaded once and shared via `Arc`.

use crate::utils::error::{Result, SunoloaderError};
use crate::utils::platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Extractor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// Site origin, without trailing slash
    pub base_url: String,

    /// Path segment preceding a song identifier
    pub song_path: String,

    /// Path segment preceding a playlist identifier
    pub playlist_path: String,

    /// User agent for both the HTTP client and rendered pages
    pub user_agent: String,

    /// Artist value used when no heuristic resolves one
    pub unknown_artist: String,

    /// Playlist title used when no heading is found
    pub untitled_playlist: String,

    /// Cover URL template; `{id}` is replaced with the identifier
    pub cover_url_template: String,

    /// Site name stripped from the end of og:title
    pub site_name: String,

    /// Static fetch timeout (ms)
    pub fetch_timeout_ms: u64,

    /// Rendered navigation timeout (ms)
    pub navigation_timeout_ms: u64,

    /// How long the network-idle heuristic may wait before giving up (ms).
    /// Capped at half the navigation timeout.
    pub network_idle_budget_ms: u64,

    /// Bounded wait for the rendered tier's readiness signal (ms)
    pub readiness_timeout_ms: u64,

    /// Wall-clock ceiling for the playlist scroll loop (ms)
    pub scroll_ceiling_ms: u64,

    /// Pause between scroll steps (ms)
    pub scroll_step_delay_ms: u64,

    /// Maximum concurrent static fetches per batch
    pub max_concurrent: usize,

    /// Stream event channel capacity
    pub stream_buffer: usize,

    /// Browser executable override
    pub browser_executable: Option<PathBuf>,

    /// Run the browser without a window
    pub headless: bool,

    /// DOM selectors and keyword lists for the rendered tier
    pub selectors: RenderedSelectors,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            base_url: "https://suno.com".to_string(),
            song_path: "song".to_string(),
            playlist_path: "playlist".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            unknown_artist: "Unknown Artist".to_string(),
            untitled_playlist: "Untitled Playlist".to_string(),
            cover_url_template: "https://cdn2.suno.ai/image_{id}.jpeg".to_string(),
            site_name: "Suno".to_string(),
            fetch_timeout_ms: 8_000,
            navigation_timeout_ms: 30_000,
            network_idle_budget_ms: 10_000,
            readiness_timeout_ms: 10_000,
            scroll_ceiling_ms: 10_000,
            scroll_step_delay_ms: 400,
            max_concurrent: 8,
            stream_buffer: 32,
            browser_executable: None,
            headless: true,
            selectors: RenderedSelectors::default(),
        }
    }
}

/// Selector and keyword data for DOM-based extraction.
///
/// These track the site's current markup and are expected to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderedSelectors {
    /// Anchor linking to a creator profile; also the readiness signal
    pub profile_link: String,
    /// Candidates for the song title, tried in order
    pub title: Vec<String>,
    /// Visible text of expand/collapse affordances next to descriptions
    pub expand_keywords: Vec<String>,
    /// Labels heading a style tag container
    pub style_labels: Vec<String>,
    /// Anchors pointing at style/genre pages
    pub style_link: String,
    /// Genre-like words identifying a bare style tag line
    pub genre_keywords: Vec<String>,
    /// Anchors referencing playlist members
    pub member_anchor: String,
    /// Playlist heading
    pub playlist_title: String,
    /// Line-clamped playlist summary
    pub playlist_description: String,
}

impl Default for RenderedSelectors {
    fn default() -> Self {
        Self {
            profile_link: r#"a[href^="/@"]"#.to_string(),
            title: vec![
                "h1".to_string(),
                r#"meta[property="og:title"]"#.to_string(),
            ],
            expand_keywords: ["show more", "show less", "see more", "see less", "more", "less"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            style_labels: ["styles", "style", "tags"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            style_link: r#"a[href*="/style/"]"#.to_string(),
            genre_keywords: [
                "pop", "rock", "jazz", "hip hop", "rap", "edm", "house", "techno", "trap",
                "lofi", "lo-fi", "ambient", "metal", "punk", "folk", "country", "blues",
                "soul", "funk", "r&b", "indie", "synthwave", "electronic", "acoustic",
                "orchestral", "cinematic", "piano", "guitar", "vocals", "female", "male",
                "upbeat", "chill", "dreamy", "dark", "melodic",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            member_anchor: r#"a[href*="/song/"]"#.to_string(),
            playlist_title: "h1".to_string(),
            playlist_description: r#"[class*="line-clamp"]"#.to_string(),
        }
    }
}

impl ExtractorSettings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings: ExtractorSettings = serde_json::from_str(&raw)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings.validated())
    }

    /// Load from the platform config directory, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        let path = platform::settings_path();
        if path.exists() {
            Self::load(&path)
        } else {
            debug!("No settings file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Enforce sane minimums
    pub fn validated(mut self) -> Self {
        if self.max_concurrent == 0 {
            self.max_concurrent = 1;
        }
        if self.stream_buffer == 0 {
            self.stream_buffer = 1;
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn song_url(&self, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.song_path, id)
    }

    pub fn playlist_url(&self, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.playlist_path, id)
    }

    /// Deterministic CDN cover for an identifier
    pub fn fallback_cover_url(&self, id: &str) -> String {
        self.cover_url_template.replace("{id}", id)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn network_idle_budget(&self) -> Duration {
        Duration::from_millis(self.network_idle_budget_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn scroll_ceiling(&self) -> Duration {
        Duration::from_millis(self.scroll_ceiling_ms)
    }

    pub fn scroll_step_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_step_delay_ms)
    }

    /// Persist settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SunoloaderError::Config(format!("cannot serialize settings: {}", e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
