pub mod hybrid;
pub mod identifier;
pub mod models;
pub mod playlist;
pub mod rendered;
pub mod static_fields;
pub mod traits;

pub use hybrid::{ExtractionMode, HybridExtractor};
pub use identifier::{normalize, parse_playlist_reference, Identifier};
pub use models::{ExtractionTier, PlaylistRecord, SongFields, SongRecord};
pub use playlist::PlaylistEnumerator;
pub use rendered::RenderedExtractor;
pub use static_fields::StaticExtractor;
pub use traits::SongExtractor;
