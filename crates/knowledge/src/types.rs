//! Knowledge system type definitions.

use crate::chunk::Chunk;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,

    /// Cosine similarity to the query vector
    pub score: f32,

    /// Document metadata plus `chunk_index`, `line_start` and `line_end`
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SearchResult {
    /// Document id the chunk came from.
    pub fn source(&self) -> &str {
        &self.chunk.source_id
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Documents processed
    pub documents: usize,

    /// Chunks produced by the splitter
    pub chunks_total: usize,

    /// Chunks whose stored hash matched and were left alone
    pub unchanged: usize,

    /// Chunks embedded and written
    pub embedded: usize,

    /// Stale chunks removed
    pub pruned: usize,
}

/// Index summary for `stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub collection: String,
    pub backend: String,
    pub sources: usize,
    pub chunks: usize,
    pub embedding: Option<String>,
}
