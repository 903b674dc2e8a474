//! Splitter implementations.

pub(crate) mod recursive;
mod semantic;

pub use recursive::RecursiveSplitter;
pub use semantic::SemanticSplitter;

use crate::chunk::ChunkOptions;
use ragline_core::AppResult;

/// Trait for chunk splitters.
pub trait ChunkSplitter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Byte spans of the chunks of `text`, in order.
    fn spans(&self, text: &str, options: &ChunkOptions) -> AppResult<Vec<(usize, usize)>>;
}
