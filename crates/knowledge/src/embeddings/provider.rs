//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
use ragline_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Failures are reported as `AppError::Retrieval`.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    ///
    /// Returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Retrieval("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
///
/// The OpenAI provider reads `OPENAI_API_KEY`; Ollama uses `baseUrl`, then
/// `OLLAMA_URL`, then the local default.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    config.validate()?;

    let provider: Arc<dyn EmbeddingProvider> = match config.provider.as_str() {
        "trigram" => Arc::new(TrigramProvider::new(config.dimensions())),
        "ollama" => {
            let base_url = config
                .base_url
                .clone()
                .or_else(|| std::env::var("OLLAMA_URL").ok())
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            Arc::new(OllamaProvider::new(
                base_url,
                config.model(),
                config.dimensions(),
            )?)
        }
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                AppError::Config(
                    "OPENAI_API_KEY must be set for the openai embedding provider".to_string(),
                )
            })?;
            let mut provider = OpenAiProvider::new(api_key, config.model(), config.dimensions());
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url);
            }
            Arc::new(provider)
        }
        other => {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'",
                other
            )))
        }
    };

    tracing::debug!(
        "Created embedding provider: provider={}, model={}, dimensions={}",
        provider.provider_name(),
        provider.model_name(),
        provider.dimensions()
    );

    Ok(provider)
}
