//! Document retrieval and answering for ragline.
//!
//! Loads a corpus, keeps a vector index of its chunks in sync, and answers
//! questions from the most similar chunks:
//!
//! ```text
//! DocumentStore::load -> VectorIndex::sync -> Assistant::answer
//! ```

pub mod chunk;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod index;
pub mod rag;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use chunk::{chunk_spans, chunk_text, Chunk, ChunkOptions, ChunkingStrategy};
pub use config::{KnowledgeConfig, StoreBackend};
pub use document::{Document, DocumentStore, LoaderOptions};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use index::VectorIndex;
pub use rag::{Answer, Assistant, FallbackPolicy, RagOptions, SourceRef};
pub use store::{MemoryStore, SqliteStore, VectorStore};
pub use types::{IndexStats, IngestStats, SearchResult};

use ragline_core::{AppConfig, AppResult};
use ragline_llm::{create_client, resolve_provider, LlmClient};
use ragline_prompt::{load_prompt, DEFAULT_ANSWER_PROMPT};
use std::path::Path;
use std::sync::Arc;

/// Read every supported document under the configured data directory.
pub fn load_corpus(workspace: &Path, knowledge: &KnowledgeConfig) -> AppResult<Vec<Document>> {
    let store = DocumentStore::new(LoaderOptions {
        recursive: knowledge.recursive,
        ..Default::default()
    });
    store.load(&knowledge.data_path(workspace))
}

/// A ready-to-query assistant over an up-to-date index.
pub struct Session {
    pub assistant: Assistant,

    /// Documents loaded from the corpus
    pub documents: usize,

    /// What the startup ingestion did
    pub ingest: IngestStats,
}

impl Session {
    /// Load the corpus, sync the index and build the assistant.
    pub async fn open(
        workspace: &Path,
        knowledge: &KnowledgeConfig,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        max_tokens: Option<u32>,
    ) -> AppResult<Self> {
        let documents = load_corpus(workspace, knowledge)?;
        tracing::info!("Loaded {} documents", documents.len());

        let index = Arc::new(VectorIndex::open(workspace, knowledge)?);
        let ingest = index.sync(&documents).await?;

        let prompt = load_prompt(workspace, DEFAULT_ANSWER_PROMPT)?;
        let options = RagOptions {
            model: model.into(),
            top_k: knowledge.retrieval.top_k,
            min_score: knowledge.retrieval.min_score,
            fallback: knowledge.retrieval.fallback,
            max_tokens,
        };

        Ok(Self {
            assistant: Assistant::new(index, llm, prompt, options),
            documents: documents.len(),
            ingest,
        })
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        self.assistant.index()
    }
}

/// Resolve LLM credentials, then open a [`Session`].
///
/// Credentials are checked before the corpus is touched, so a missing key
/// fails fast with a configuration error.
pub async fn start_session<F>(
    workspace: &Path,
    app: &AppConfig,
    knowledge: &KnowledgeConfig,
    lookup: F,
) -> AppResult<Session>
where
    F: Fn(&str) -> Option<String>,
{
    let selection = resolve_provider(app.provider.as_deref(), app.model.as_deref(), lookup)?;
    let llm = create_client(&selection)?;
    Session::open(workspace, knowledge, llm, selection.model.clone(), app.max_tokens).await
}
