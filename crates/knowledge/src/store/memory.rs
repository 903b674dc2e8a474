//! In-memory vector store using cosine similarity.
//!
//! Contents live for the life of the process; useful for tests and one-shot
//! sessions that should not touch disk.

use super::{check_dimensions, cosine_similarity, rank, StoredChunk, VectorStore};
use crate::types::SearchResult;
use async_trait::async_trait;
use ragline_core::AppResult;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    chunks: HashMap<String, StoredChunk>,
    signature: Option<String>,
}

impl Inner {
    fn dimensions(&self) -> Option<usize> {
        self.chunks.values().next().map(|c| c.embedding.len())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, chunks: Vec<StoredChunk>) -> AppResult<usize> {
        let mut inner = self.inner.write().await;

        let mut dimensions = inner.dimensions();
        for chunk in &chunks {
            match dimensions {
                Some(expected) => check_dimensions(expected, chunk.embedding.len())?,
                None => dimensions = Some(chunk.embedding.len()),
            }
        }

        let written = chunks.len();
        for chunk in chunks {
            inner.chunks.insert(chunk.chunk.id.clone(), chunk);
        }
        Ok(written)
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> AppResult<Vec<SearchResult>> {
        let inner = self.inner.read().await;
        if let Some(expected) = inner.dimensions() {
            check_dimensions(expected, embedding.len())?;
        }

        let mut results: Vec<SearchResult> = inner
            .chunks
            .values()
            .map(|stored| SearchResult {
                chunk: stored.chunk.clone(),
                score: cosine_similarity(&stored.embedding, embedding),
                metadata: stored.metadata.clone(),
            })
            .collect();

        rank(&mut results, top_k);
        Ok(results)
    }

    async fn hashes(&self, source_id: &str) -> AppResult<HashMap<String, String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .chunks
            .values()
            .filter(|c| c.chunk.source_id == source_id)
            .map(|c| (c.chunk.id.clone(), c.chunk.hash.clone()))
            .collect())
    }

    async fn prune_source(&self, source_id: &str, keep: &HashSet<String>) -> AppResult<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.chunks.len();
        inner
            .chunks
            .retain(|id, c| c.chunk.source_id != source_id || keep.contains(id));
        Ok(before - inner.chunks.len())
    }

    async fn sources(&self) -> AppResult<Vec<String>> {
        let inner = self.inner.read().await;
        let mut sources: Vec<String> = inner
            .chunks
            .values()
            .map(|c| c.chunk.source_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        sources.sort();
        Ok(sources)
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.inner.read().await.chunks.len())
    }

    async fn signature(&self) -> AppResult<Option<String>> {
        Ok(self.inner.read().await.signature.clone())
    }

    async fn set_signature(&self, signature: &str) -> AppResult<()> {
        self.inner.write().await.signature = Some(signature.to_string());
        Ok(())
    }

    async fn reset(&self) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.chunks.clear();
        inner.signature = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use ragline_core::AppError;
    use std::collections::BTreeMap;

    fn stored(source: &str, index: u32, text: &str, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            chunk: Chunk::new(source, index, text.to_string(), (0, text.len())),
            embedding,
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_query() {
        let store = MemoryStore::new();
        store
            .upsert(vec![
                stored("a.txt", 0, "alpha", vec![1.0, 0.0]),
                stored("b.txt", 0, "beta", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.query(&[0.9, 0.1], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "alpha");
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.source_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = MemoryStore::new();
        store
            .upsert(vec![stored("a.txt", 0, "old", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(vec![stored("a.txt", 0, "new", vec![1.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let results = store.query(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].chunk.text, "new");
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = MemoryStore::new();
        store
            .upsert(vec![stored("a.txt", 0, "alpha", vec![1.0, 0.0])])
            .await
            .unwrap();

        let result = store
            .upsert(vec![stored("b.txt", 0, "beta", vec![1.0, 0.0, 0.0])])
            .await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
        assert!(matches!(
            store.query(&[1.0], 1).await,
            Err(AppError::Retrieval(_))
        ));
    }

    #[tokio::test]
    async fn test_prune_and_hashes() {
        let store = MemoryStore::new();
        store
            .upsert(vec![
                stored("a.txt", 0, "one", vec![1.0, 0.0]),
                stored("a.txt", 1, "two", vec![1.0, 0.0]),
                stored("b.txt", 0, "three", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hashes = store.hashes("a.txt").await.unwrap();
        assert_eq!(hashes.len(), 2);

        let keep: HashSet<String> = [Chunk::new("a.txt", 0, String::new(), (0, 0)).id]
            .into_iter()
            .collect();
        assert_eq!(store.prune_source("a.txt", &keep).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 2);

        assert_eq!(store.prune_source("b.txt", &HashSet::new()).await.unwrap(), 1);
        assert_eq!(store.sources().await.unwrap(), vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_reset_clears_signature() {
        let store = MemoryStore::new();
        store.set_signature("trigram/trigram-v1/2").await.unwrap();
        store
            .upsert(vec![stored("a.txt", 0, "alpha", vec![1.0, 0.0])])
            .await
            .unwrap();

        store.reset().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.signature().await.unwrap(), None);
    }
}
