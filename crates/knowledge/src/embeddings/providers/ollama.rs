//! Ollama embedding provider.
//!
//! Calls the batch `/api/embed` endpoint of a local (or remote) Ollama
//! server. Transient failures are retried with exponential backoff.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use ragline_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const EMBED_ENDPOINT: &str = "/api/embed";

/// Maximum attempts per batch request
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// No request is made until the first embedding call.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Retrieval(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions,
        })
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_with_retries(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;

        loop {
            match self.embed_once(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(e);
                    }

                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, MAX_RETRIES, backoff_ms, e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    async fn embed_once(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::Retrieval(format!(
                    "Ollama not reachable at {}: {}. Ensure Ollama is running and run: ollama pull {}",
                    self.base_url, e, self.model
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|r| r.error)
                .unwrap_or(body);
            return Err(AppError::Retrieval(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse Ollama response: {}", e)))?;

        check_embeddings(body.embeddings, texts.len(), self.dimensions)
    }
}

/// Rejects responses with the wrong count or vector width.
fn check_embeddings(
    embeddings: Vec<Vec<f32>>,
    expected_count: usize,
    dimensions: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if embeddings.len() != expected_count {
        return Err(AppError::Retrieval(format!(
            "Ollama returned {} embeddings for {} inputs",
            embeddings.len(),
            expected_count
        )));
    }

    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(AppError::Retrieval(format!(
            "Unexpected embedding dimensions: got {}, expected {}",
            bad.len(),
            dimensions
        )));
    }

    Ok(embeddings)
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_with_retries(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let body: EmbedResponse =
            serde_json::from_str(r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2],[0.3,0.4]]}"#)
                .unwrap();
        let embeddings = check_embeddings(body.embeddings, 2, 2).unwrap();
        assert_eq!(embeddings[1], vec![0.3, 0.4]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = check_embeddings(vec![vec![0.1, 0.2, 0.3]], 1, 2);
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[test]
    fn test_count_mismatch() {
        let result = check_embeddings(vec![vec![0.1, 0.2]], 2, 2);
        assert!(result.unwrap_err().to_string().contains("1 embeddings for 2 inputs"));
    }

    #[test]
    fn test_request_body() {
        let input = vec!["First text".to_string(), "Second text".to_string()];
        let body = serde_json::to_value(EmbedRequest {
            model: "nomic-embed-text",
            input: &input,
        })
        .unwrap();
        assert_eq!(body["model"], "nomic-embed-text");
        assert_eq!(body["input"][1], "Second text");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_retrieval_error() {
        let provider = OllamaProvider::new("http://127.0.0.1:9", "nomic-embed-text", 768).unwrap();
        let result = provider.embed("hello").await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let provider = OllamaProvider::new("http://127.0.0.1:9", "nomic-embed-text", 768).unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
