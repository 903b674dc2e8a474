//! Ollama LLM provider.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use super::{error_for_status, line_stream};
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use futures::StreamExt;
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "ollama";

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama `/api/generate` request body.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    options: GenerateOptions,
    stream: bool,
}

/// One `/api/generate` response object; streaming sends one per line.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    #[serde(default)]
    response: String,
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaResponse {
    fn usage(&self) -> LlmUsage {
        LlmUsage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        )
    }
}

/// Ollama LLM client.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Client for the default local runtime at http://localhost:11434.
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn to_ollama_request(&self, request: &LlmRequest, stream: bool) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream,
        }
    }

    async fn send(&self, request: &LlmRequest, stream: bool) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.to_ollama_request(request, stream))
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to send request to Ollama: {}", e)))?;

        error_for_status(response, "Ollama").await
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_chunk(line: &str) -> AppResult<LlmStreamChunk> {
    let parsed: OllamaResponse = serde_json::from_str(line)
        .map_err(|e| AppError::Generation(format!("Failed to parse Ollama chunk: {}", e)))?;

    Ok(LlmStreamChunk {
        usage: parsed.done.then(|| parsed.usage()),
        content: parsed.response,
        model: parsed.model,
        done: parsed.done,
    })
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Ollama");
        tracing::debug!("Request: {:?}", request);

        let response = self.send(request, false).await?;
        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::info!("Received completion from Ollama");
        Ok(LlmResponse {
            usage: parsed.usage(),
            content: parsed.response,
            model: parsed.model,
            done: parsed.done,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to Ollama");

        let response = self.send(request, true).await?;
        let chunks = line_stream(response.bytes_stream(), PROVIDER)
            .map(|line| line.and_then(|l| parse_chunk(&l)));

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::with_base_url("http://gpu-box:11434/");
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("Hello", "llama3.2")
            .with_temperature(0.0)
            .with_max_tokens(100);

        let body = serde_json::to_value(client.to_ollama_request(&request, false)).unwrap();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["prompt"], "Hello");
        assert_eq!(body["options"]["temperature"], 0.0);
        assert_eq!(body["options"]["num_predict"], 100);
        assert_eq!(body["stream"], false);
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_parse_final_chunk_carries_usage() {
        let chunk = parse_chunk(
            r#"{"model":"llama3.2","response":"","done":true,"prompt_eval_count":12,"eval_count":4}"#,
        )
        .unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.usage, Some(LlmUsage::new(12, 4)));

        let chunk = parse_chunk(r#"{"model":"llama3.2","response":"Hi","done":false}"#).unwrap();
        assert_eq!(chunk.content, "Hi");
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn test_parse_garbage_is_generation_error() {
        let err = parse_chunk("not json").unwrap_err();
        assert_eq!(err.kind(), "GenerationError");
    }
}
