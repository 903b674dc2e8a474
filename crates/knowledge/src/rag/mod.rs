//! Retrieval-augmented answering over the vector index.

pub mod assistant;
pub mod types;

pub use assistant::Assistant;
pub use types::{sources_for, Answer, FallbackPolicy, RagOptions, SourceRef};
