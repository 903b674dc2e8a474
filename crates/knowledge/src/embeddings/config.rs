//! Embedding configuration.

use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding configuration, the `knowledge.embedding` section of
/// `config.yaml`.
///
/// `model` and `dimensions` fall back to per-provider defaults so switching
/// provider alone yields a working setup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama", "openai"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default)]
    pub model: Option<String>,

    /// Embedding vector dimensions
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Maximum texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Embedding requests allowed in flight during ingestion
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Provider endpoint override
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_provider() -> String {
    "trigram".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_concurrency() -> usize {
    1
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dimensions: None,
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            base_url: None,
        }
    }
}

impl EmbeddingConfig {
    /// Effective model name.
    pub fn model(&self) -> String {
        self.model.clone().unwrap_or_else(|| {
            match self.provider.as_str() {
                "ollama" => "nomic-embed-text",
                "openai" => "text-embedding-3-small",
                _ => "trigram-v1",
            }
            .to_string()
        })
    }

    /// Effective vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions.unwrap_or(match self.provider.as_str() {
            "ollama" => 768,
            "openai" => 1536,
            _ => 384,
        })
    }

    /// Identifies the vector space an index was built in.
    ///
    /// Vectors from different signatures are not comparable.
    pub fn signature(&self) -> String {
        format!("{}/{}/{}", self.provider, self.model(), self.dimensions())
    }

    pub fn validate(&self) -> AppResult<()> {
        if !matches!(self.provider.as_str(), "trigram" | "ollama" | "openai") {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: trigram, ollama, openai",
                self.provider
            )));
        }

        if self.dimensions() == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(AppError::Config(
                "embedding batchSize must be greater than zero".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(AppError::Config(
                "embedding concurrency must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model(), "trigram-v1");
        assert_eq!(config.dimensions(), 384);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.signature(), "trigram/trigram-v1/384");
    }

    #[test]
    fn test_provider_defaults() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        assert_eq!(config.model(), "nomic-embed-text");
        assert_eq!(config.dimensions(), 768);

        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            dimensions: Some(256),
            ..Default::default()
        };
        assert_eq!(config.model(), "text-embedding-3-small");
        assert_eq!(config.dimensions(), 256);
    }

    #[test]
    fn test_yaml_camel_case() {
        let yaml = "provider: ollama\nmodel: mxbai-embed-large\ndimensions: 1024\nbatchSize: 8\nconcurrency: 2\nbaseUrl: http://gpu:11434\n";
        let config: EmbeddingConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model(), "mxbai-embed-large");
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.base_url.as_deref(), Some("http://gpu:11434"));
    }

    #[test]
    fn test_validate() {
        assert!(EmbeddingConfig::default().validate().is_ok());

        let unknown = EmbeddingConfig {
            provider: "gguf".to_string(),
            ..Default::default()
        };
        assert!(unknown
            .validate()
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));

        let zero_batch = EmbeddingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(zero_batch.validate(), Err(AppError::Config(_))));

        let zero_concurrency = EmbeddingConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_concurrency.validate(),
            Err(AppError::Config(_))
        ));
    }
}
