//! Vector storage backends.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::chunk::Chunk;
use crate::types::SearchResult;
use async_trait::async_trait;
use ragline_core::{AppError, AppResult};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A chunk with its vector, as written to a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
    pub metadata: BTreeMap<String, String>,
}

/// Storage for chunk vectors within one collection.
///
/// All vectors in a store share one dimension; writes or queries with another
/// dimension fail with `AppError::Retrieval`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Insert or replace chunks by id. Returns the number written.
    async fn upsert(&self, chunks: Vec<StoredChunk>) -> AppResult<usize>;

    /// Top `top_k` chunks by cosine similarity, score descending then id
    /// ascending.
    async fn query(&self, embedding: &[f32], top_k: usize) -> AppResult<Vec<SearchResult>>;

    /// Stored text hash per chunk id for one source.
    async fn hashes(&self, source_id: &str) -> AppResult<HashMap<String, String>>;

    /// Delete chunks of `source_id` whose id is not in `keep`.
    async fn prune_source(&self, source_id: &str, keep: &HashSet<String>) -> AppResult<usize>;

    /// Distinct source ids, sorted.
    async fn sources(&self) -> AppResult<Vec<String>>;

    async fn count(&self) -> AppResult<usize>;

    async fn source_count(&self) -> AppResult<usize> {
        Ok(self.sources().await?.len())
    }

    /// Embedding signature the stored vectors were built with.
    async fn signature(&self) -> AppResult<Option<String>>;

    async fn set_signature(&self, signature: &str) -> AppResult<()>;

    /// Remove every chunk and the signature.
    async fn reset(&self) -> AppResult<()>;
}

/// Cosine similarity of two vectors; 0.0 when either has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score descending, then chunk id ascending.
pub(crate) fn rank(results: &mut Vec<SearchResult>, top_k: usize) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    results.truncate(top_k);
}

pub(crate) fn check_dimensions(expected: usize, actual: usize) -> AppResult<()> {
    if expected != actual {
        return Err(AppError::Retrieval(format!(
            "Embedding dimension mismatch: store holds {}-dimensional vectors, got {}",
            expected, actual
        )));
    }
    Ok(())
}

/// Little-endian f32 encoding used for BLOB columns.
pub(crate) fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

pub(crate) fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Retrieval(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
