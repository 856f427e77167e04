//! Error handling for Sunoloader

use thiserror::Error;

/// Main error type for Sunoloader
///
/// Heuristic misses are not represented here: a field extractor that finds
/// nothing returns `None` and the chain moves on.
#[derive(Debug, Error)]
pub enum SunoloaderError {
    #[error("Invalid playlist or song reference: {0}")]
    InvalidReference(String),

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("HTTP {status} while fetching {url}")]
    HttpError { status: u16, url: String },

    #[error("Fetching {url} timed out after {timeout_ms}ms")]
    FetchTimeout { url: String, timeout_ms: u64 },

    #[error("No Chromium-compatible browser found. Install Chromium or set `browser_executable`")]
    BrowserNotFound,

    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("Browser session lost: {0}")]
    SessionLost(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SunoloaderError {
    /// Whether this error invalidates the whole rendering session rather
    /// than a single page.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            SunoloaderError::BrowserNotFound
                | SunoloaderError::BrowserLaunch(_)
                | SunoloaderError::SessionLost(_)
        )
    }
}

pub type Result<T, E = SunoloaderError> = std::result::Result<T, E>;
