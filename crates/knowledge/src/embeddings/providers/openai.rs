//! OpenAI embedding provider using the `/embeddings` endpoint.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Only the text-embedding-3 family accepts a dimensions override.
    fn request_dimensions(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimensions)
    }
}

/// Orders vectors by their `index` field and checks their width.
fn into_vectors(
    response: EmbeddingResponse,
    expected_count: usize,
    dimensions: usize,
) -> AppResult<Vec<Vec<f32>>> {
    let mut data = response.data;
    data.sort_by_key(|d| d.index);

    if data.len() != expected_count {
        return Err(AppError::Retrieval(format!(
            "OpenAI returned {} embeddings for {} inputs",
            data.len(),
            expected_count
        )));
    }

    data.into_iter()
        .map(|d| {
            if d.embedding.len() == dimensions {
                Ok(d.embedding)
            } else {
                Err(AppError::Retrieval(format!(
                    "Unexpected embedding dimensions: got {}, expected {}",
                    d.embedding.len(),
                    dimensions
                )))
            }
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
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

        debug!(batch_size = texts.len(), model = %self.model, "embedding batch");

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
                dimensions: self.request_dimensions(),
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "embedding request failed");
                AppError::Retrieval(format!("OpenAI embedding request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AppError::Retrieval(format!(
                "OpenAI embeddings API returned {}: {}",
                status, detail
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(format!("Failed to parse OpenAI embedding response: {}", e))
        })?;

        into_vectors(body, texts.len(), self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_follow_index_order() {
        let body: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .unwrap();
        let vectors = into_vectors(body, 2, 2).unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0]);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let body: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#).unwrap();
        assert!(matches!(
            into_vectors(body, 1, 2),
            Err(AppError::Retrieval(_))
        ));
    }

    #[test]
    fn test_dimensions_only_sent_for_v3_models() {
        let v3 = OpenAiProvider::new("sk-test", "text-embedding-3-small", 512);
        assert_eq!(v3.request_dimensions(), Some(512));

        let ada = OpenAiProvider::new("sk-test", "text-embedding-ada-002", 1536);
        assert_eq!(ada.request_dimensions(), None);
    }

    #[test]
    fn test_base_url_override() {
        let provider = OpenAiProvider::new("sk-test", "text-embedding-3-small", 1536)
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }
}
