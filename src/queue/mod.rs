pub mod batch;
pub mod events;
pub mod merge;
pub mod stream;

pub use batch::BatchOrchestrator;
pub use events::StreamEvent;
pub use merge::MergedResults;
pub use stream::StreamingOrchestrator;
