//! Utility modules for error handling, configuration and text cleanup

pub mod config;
pub mod entities;
pub mod error;
pub mod platform;

// Re-export for convenience
pub use config::{ExtractorSettings, RenderedSelectors};
pub use entities::{clean_text, decode_html_entities};
pub use error::{Result, SunoloaderError};
