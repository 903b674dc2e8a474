//! Knowledge configuration: the `knowledge:` section of `config.yaml`.

use crate::chunk::{ChunkOptions, ChunkingStrategy};
use crate::embeddings::EmbeddingConfig;
use crate::rag::FallbackPolicy;
use ragline_core::config::STATE_DIR;
use ragline_core::{AppConfig, AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default collection name (env `COLLECTION_NAME`).
pub const DEFAULT_COLLECTION: &str = "rag_documents";

const INDEX_FILE: &str = "index.sqlite";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeConfig {
    /// Corpus directory, relative to the workspace unless absolute
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Descend into subdirectories of the corpus
    #[serde(default)]
    pub recursive: bool,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingConfig {
    #[serde(default)]
    pub strategy: ChunkingStrategy,

    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite file; defaults to `.ragline/index.sqlite`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Results scoring below this are dropped before prompting
    #[serde(default)]
    pub min_score: Option<f32>,

    #[serde(default)]
    pub fallback: FallbackPolicy,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_top_k() -> usize {
    3
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            recursive: false,
            collection: default_collection(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            store: StoreConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: None,
            fallback: FallbackPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    knowledge: Option<KnowledgeConfig>,
}

impl KnowledgeConfig {
    /// Load from the workspace config file, then apply environment
    /// overrides and validate.
    pub fn load(app: &AppConfig) -> AppResult<Self> {
        let path = app.config_path();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
            })?;
            Self::from_yaml_str(&contents).map_err(|e| {
                AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        tracing::debug!(
            "Knowledge config: collection={}, embedding={}, store={:?}",
            config.collection,
            config.embedding.signature(),
            config.store.backend
        );
        Ok(config)
    }

    /// Parse the `knowledge` section of a full `config.yaml` document.
    pub fn from_yaml_str(contents: &str) -> AppResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile = serde_yaml::from_str(contents)?;
        Ok(file.knowledge.unwrap_or_default())
    }

    /// Apply `COLLECTION_NAME`, `EMBEDDING_PROVIDER`, `EMBEDDING_MODEL` and
    /// `RAGLINE_DATA`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(collection) = lookup("COLLECTION_NAME") {
            self.collection = collection;
        }

        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            let provider = provider.to_lowercase();
            if provider != self.embedding.provider {
                // Model and width belong to the previous provider.
                self.embedding.model = None;
                self.embedding.dimensions = None;
                self.embedding.provider = provider;
            }
        }

        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = Some(model);
        }

        if let Some(data) = lookup("RAGLINE_DATA") {
            self.data_dir = PathBuf::from(data);
        }
    }

    pub fn chunk_options(&self) -> ChunkOptions {
        ChunkOptions::new(self.chunking.chunk_size, self.chunking.chunk_overlap)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.chunk_options().validate()?;
        self.embedding.validate()?;

        if self.collection.trim().is_empty() {
            return Err(AppError::Config(
                "collection name must not be empty".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "topK must be greater than zero".to_string(),
            ));
        }

        if let Some(min_score) = self.retrieval.min_score {
            if !(-1.0..=1.0).contains(&min_score) {
                return Err(AppError::Config(format!(
                    "minScore must be between -1.0 and 1.0, got {}",
                    min_score
                )));
            }
        }

        Ok(())
    }

    /// Corpus directory resolved against the workspace.
    pub fn data_path(&self, workspace: &Path) -> PathBuf {
        if self.data_dir.is_absolute() {
            self.data_dir.clone()
        } else {
            workspace.join(&self.data_dir)
        }
    }

    /// SQLite index file resolved against the workspace.
    pub fn index_path(&self, workspace: &Path) -> PathBuf {
        match &self.store.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => workspace.join(path),
            None => workspace.join(STATE_DIR).join(INDEX_FILE),
        }
    }
}
