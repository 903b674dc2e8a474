//! Vector index: chunking, embedding and storage behind one API.
//!
//! Ingestion is incremental. A chunk is re-embedded only when its text hash
//! differs from what the store holds, and chunks a document no longer
//! produces are pruned.

use crate::chunk::{chunk_document, line_range, Chunk, ChunkOptions, ChunkSplitter, RecursiveSplitter};
use crate::config::{KnowledgeConfig, StoreBackend};
use crate::document::Document;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::store::{MemoryStore, SqliteStore, StoredChunk, VectorStore};
use crate::types::{IndexStats, IngestStats, SearchResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use ragline_core::{AppError, AppResult};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: Box<dyn ChunkSplitter>,
    options: ChunkOptions,
    batch_size: usize,
    concurrency: usize,
    collection: String,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("backend", &self.store.backend_name())
            .field("embedding", &self.signature())
            .field("splitter", &self.splitter.name())
            .field("options", &self.options)
            .field("collection", &self.collection)
            .finish()
    }
}

impl VectorIndex {
    /// Index with the recursive splitter, default chunk sizes and sequential
    /// embedding in batches of 32.
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            splitter: Box::new(RecursiveSplitter),
            options: ChunkOptions::default(),
            batch_size: 32,
            concurrency: 1,
            collection: crate::config::DEFAULT_COLLECTION.to_string(),
        }
    }

    pub fn with_splitter(mut self, splitter: Box<dyn ChunkSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_chunk_options(mut self, options: ChunkOptions) -> Self {
        self.options = options;
        self
    }

    /// Texts per embedding request and requests in flight; both at least 1.
    pub fn with_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Build the index described by `config` for `workspace`.
    pub fn open(workspace: &Path, config: &KnowledgeConfig) -> AppResult<Self> {
        config.validate()?;

        let embedder = create_provider(&config.embedding)?;
        let store: Arc<dyn VectorStore> = match config.store.backend {
            StoreBackend::Sqlite => Arc::new(SqliteStore::open(
                &config.index_path(workspace),
                config.collection.clone(),
            )?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };

        Ok(Self::new(store, embedder)
            .with_splitter(config.chunking.strategy.splitter())
            .with_chunk_options(config.chunk_options())
            .with_batching(config.embedding.batch_size, config.embedding.concurrency)
            .with_collection(config.collection.clone()))
    }

    /// `provider/model/dimensions` of the active embedder.
    pub fn signature(&self) -> String {
        format!(
            "{}/{}/{}",
            self.embedder.provider_name(),
            self.embedder.model_name(),
            self.embedder.dimensions()
        )
    }

    /// Fails when the store holds vectors from a different embedder.
    async fn check_signature(&self) -> AppResult<()> {
        let current = self.signature();
        match self.store.signature().await? {
            Some(stored) if stored != current && self.store.count().await? > 0 => {
                Err(AppError::Retrieval(format!(
                    "index was built with embeddings '{}' but '{}' is configured; run `ragline ingest --reset`",
                    stored, current
                )))
            }
            _ => Ok(()),
        }
    }

    /// Chunk, embed and store `documents`.
    ///
    /// Unchanged chunks are skipped without embedding calls. Chunks a
    /// document no longer produces are deleted. Other sources are untouched.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn add_documents(&self, documents: &[Document]) -> AppResult<IngestStats> {
        self.check_signature().await?;

        let mut stats = IngestStats {
            documents: documents.len(),
            ..Default::default()
        };
        let mut pending: Vec<(Chunk, BTreeMap<String, String>)> = Vec::new();
        let mut keep_by_source: Vec<(&str, HashSet<String>)> = Vec::new();

        for document in documents {
            let chunks = chunk_document(document, self.splitter.as_ref(), &self.options)?;
            let stored = self.store.hashes(&document.id).await?;
            stats.chunks_total += chunks.len();

            let keep: HashSet<String> = chunks.iter().map(|c| c.id.clone()).collect();
            for chunk in chunks {
                if stored.get(&chunk.id) == Some(&chunk.hash) {
                    stats.unchanged += 1;
                } else {
                    let metadata = chunk_metadata(document, &chunk);
                    pending.push((chunk, metadata));
                }
            }
            keep_by_source.push((document.id.as_str(), keep));
        }

        if !pending.is_empty() {
            let texts: Vec<String> = pending.iter().map(|(c, _)| c.text.clone()).collect();
            let embeddings = self.embed_all(texts).await?;

            let stored: Vec<StoredChunk> = pending
                .into_iter()
                .zip(embeddings)
                .map(|((chunk, metadata), embedding)| StoredChunk {
                    chunk,
                    embedding,
                    metadata,
                })
                .collect();
            stats.embedded = self.store.upsert(stored).await?;
        }

        for (source, keep) in &keep_by_source {
            stats.pruned += self.store.prune_source(source, keep).await?;
        }

        if stats.embedded > 0 || self.store.signature().await?.is_none() {
            self.store.set_signature(&self.signature()).await?;
        }

        info!(
            "Indexed {} documents: {} chunks ({} embedded, {} unchanged, {} pruned)",
            stats.documents, stats.chunks_total, stats.embedded, stats.unchanged, stats.pruned
        );
        Ok(stats)
    }

    /// Embed in batches with up to `concurrency` requests in flight,
    /// preserving input order.
    async fn embed_all(&self, texts: Vec<String>) -> AppResult<Vec<Vec<f32>>> {
        let expected = texts.len();
        let batches: Vec<Vec<String>> = texts
            .chunks(self.batch_size)
            .map(|batch| batch.to_vec())
            .collect();
        debug!(
            "Embedding {} chunks in {} batches (concurrency {})",
            expected,
            batches.len(),
            self.concurrency
        );

        let embedder = &self.embedder;
        let results: Vec<Vec<Vec<f32>>> = stream::iter(batches)
            .map(|batch| async move { embedder.embed_batch(&batch).await })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let embeddings: Vec<Vec<f32>> = results.into_iter().flatten().collect();
        if embeddings.len() != expected {
            return Err(AppError::Retrieval(format!(
                "embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                expected
            )));
        }
        Ok(embeddings)
    }

    /// Delete every source not present in `documents`.
    pub async fn remove_missing(&self, documents: &[Document]) -> AppResult<usize> {
        let present: HashSet<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        let mut removed = 0;
        for source in self.store.sources().await? {
            if !present.contains(source.as_str()) {
                removed += self.store.prune_source(&source, &HashSet::new()).await?;
                debug!("Removed chunks of deleted source {}", source);
            }
        }
        Ok(removed)
    }

    /// Make the index mirror `documents` exactly.
    pub async fn sync(&self, documents: &[Document]) -> AppResult<IngestStats> {
        let mut stats = self.add_documents(documents).await?;
        stats.pruned += self.remove_missing(documents).await?;
        Ok(stats)
    }

    /// The `top_k` chunks most similar to `query`, best first.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(AppError::Retrieval("query must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(AppError::Retrieval(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if self.is_empty().await? {
            return Err(AppError::Retrieval(
                "index is empty; add documents before searching".to_string(),
            ));
        }
        self.check_signature().await?;

        let embedding = self.embedder.embed(query).await?;
        let results = self.store.query(&embedding, top_k).await?;

        debug!(
            "Search returned {} results (top score {:.3})",
            results.len(),
            results.first().map(|r| r.score).unwrap_or(0.0)
        );
        Ok(results)
    }

    pub async fn is_empty(&self) -> AppResult<bool> {
        Ok(self.store.count().await? == 0)
    }

    pub async fn stats(&self) -> AppResult<IndexStats> {
        Ok(IndexStats {
            collection: self.collection.clone(),
            backend: self.store.backend_name().to_string(),
            sources: self.store.source_count().await?,
            chunks: self.store.count().await?,
            embedding: self.store.signature().await?,
        })
    }

    pub async fn reset(&self) -> AppResult<()> {
        self.store.reset().await
    }
}

fn chunk_metadata(document: &Document, chunk: &Chunk) -> BTreeMap<String, String> {
    let (line_start, line_end) = line_range(&document.content, chunk.start, chunk.end);
    let mut metadata = document.metadata.clone();
    metadata.insert("chunk_index".to_string(), chunk.index.to_string());
    metadata.insert("line_start".to_string(), line_start.to_string());
    metadata.insert("line_end".to_string(), line_end.to_string());
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;

    fn memory_index() -> VectorIndex {
        VectorIndex::new(
            Arc::new(MemoryStore::new()),
            Arc::new(TrigramProvider::new(64)),
        )
        .with_chunk_options(ChunkOptions::new(80, 10))
    }

    #[tokio::test]
    async fn test_search_empty_index() {
        let index = memory_index();
        let err = index.search("anything", 3).await.unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
        assert!(err.to_string().contains("index is empty"));
    }

    #[tokio::test]
    async fn test_search_rejects_bad_arguments() {
        let index = memory_index();
        index
            .add_documents(&[Document::from_text("a.txt", "Some content here.")])
            .await
            .unwrap();

        assert!(matches!(
            index.search("   ", 3).await,
            Err(AppError::Retrieval(_))
        ));
        assert!(matches!(
            index.search("content", 0).await,
            Err(AppError::Retrieval(_))
        ));
    }

    #[tokio::test]
    async fn test_metadata_carries_lines() {
        let index = memory_index();
        let content = "First line about rust.\nSecond line about rust.";
        index
            .add_documents(&[Document::from_text("notes/rust.md", content)])
            .await
            .unwrap();

        let results = index.search("rust", 1).await.unwrap();
        let metadata = &results[0].metadata;
        assert_eq!(metadata.get("title").map(String::as_str), Some("rust"));
        assert_eq!(metadata.get("chunk_index").map(String::as_str), Some("0"));
        assert_eq!(metadata.get("line_start").map(String::as_str), Some("1"));
        assert_eq!(metadata.get("line_end").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_changed_document_prunes_stale_chunks() {
        let index = memory_index();
        let long = "Paragraph one is here.\n\n".repeat(10);
        let stats = index
            .add_documents(&[Document::from_text("a.txt", long)])
            .await
            .unwrap();
        assert!(stats.chunks_total > 1);

        let stats = index
            .add_documents(&[Document::from_text("a.txt", "Short now.")])
            .await
            .unwrap();
        assert_eq!(stats.chunks_total, 1);
        assert_eq!(stats.embedded, 1);
        assert!(stats.pruned > 0);
        assert_eq!(index.stats().await.unwrap().chunks, 1);
    }

    #[tokio::test]
    async fn test_sync_removes_deleted_sources() {
        let index = memory_index();
        index
            .add_documents(&[
                Document::from_text("a.txt", "Alpha text."),
                Document::from_text("b.txt", "Beta text."),
            ])
            .await
            .unwrap();

        let stats = index
            .sync(&[Document::from_text("a.txt", "Alpha text.")])
            .await
            .unwrap();
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.pruned, 1);

        let stats = index.stats().await.unwrap();
        assert_eq!(stats.sources, 1);
        assert_eq!(stats.embedding.as_deref(), Some("trigram/trigram-v1/64"));
    }

    #[tokio::test]
    async fn test_embedder_change_is_detected() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryStore::new());
        let first = VectorIndex::new(store.clone(), Arc::new(TrigramProvider::new(64)));
        first
            .add_documents(&[Document::from_text("a.txt", "Alpha text.")])
            .await
            .unwrap();

        let second = VectorIndex::new(store, Arc::new(TrigramProvider::new(32)));
        let err = second.search("alpha", 1).await.unwrap_err();
        assert!(err.to_string().contains("ingest --reset"));

        second.reset().await.unwrap();
        second
            .add_documents(&[Document::from_text("a.txt", "Alpha text.")])
            .await
            .unwrap();
        assert_eq!(second.search("alpha", 1).await.unwrap().len(), 1);
    }
}
