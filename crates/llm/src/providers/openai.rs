//! OpenAI-compatible chat completions provider.
//!
//! OpenAI, Groq and Perplexity all expose `POST {base}/chat/completions`
//! with the same request and response shapes, so one client serves all three.

use super::{error_for_status, line_stream, sse_data};
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::types::ProviderType;
use futures::StreamExt;
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatContent>,
    #[serde(default)]
    delta: Option<ChatContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl From<ChatUsage> for LlmUsage {
    fn from(usage: ChatUsage) -> Self {
        LlmUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

/// Client for providers speaking the OpenAI chat completions protocol.
pub struct OpenAiCompatClient {
    provider: ProviderType,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        provider: ProviderType,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_chat_request(&self, request: &LlmRequest, stream: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(&self, request: &LlmRequest, stream: bool) -> AppResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request, stream))
            .send()
            .await
            .map_err(|e| {
                AppError::Generation(format!(
                    "Failed to send request to {}: {}",
                    self.provider, e
                ))
            })?;

        error_for_status(response, self.provider.as_str()).await
    }
}

fn parse_delta(data: &str, fallback_model: &str) -> AppResult<LlmStreamChunk> {
    let parsed: ChatResponse = serde_json::from_str(data)
        .map_err(|e| AppError::Generation(format!("Failed to parse stream chunk: {}", e)))?;

    let choice = parsed.choices.into_iter().next();
    let done = choice
        .as_ref()
        .map(|c| c.finish_reason.is_some())
        .unwrap_or(false);
    let content = choice
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .unwrap_or_default();

    Ok(LlmStreamChunk {
        content,
        model: parsed.model.unwrap_or_else(|| fallback_model.to_string()),
        done,
        usage: parsed.usage.map(LlmUsage::from),
    })
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        self.provider.as_str()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to {}", self.provider);
        tracing::debug!("Request: {:?}", request);

        let response = self.send(request, false).await?;
        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::Generation(format!("Failed to parse {} response: {}", self.provider, e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| {
                AppError::Generation(format!("{} returned no completion", self.provider))
            })?;

        tracing::info!("Received completion from {}", self.provider);
        Ok(LlmResponse {
            content,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            usage: parsed.usage.map(LlmUsage::from).unwrap_or_default(),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to {}", self.provider);

        let response = self.send(request, true).await?;
        let model = request.model.clone();
        let chunks = line_stream(response.bytes_stream(), self.provider.as_str()).filter_map(
            move |line| {
                let chunk = match line {
                    Ok(line) => sse_data(&line).map(|data| parse_delta(data, &model)),
                    Err(e) => Some(Err(e)),
                };
                futures::future::ready(chunk)
            },
        );

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiCompatClient {
        OpenAiCompatClient::new(ProviderType::Groq, ProviderType::Groq.default_endpoint(), "k")
    }

    #[test]
    fn test_provider_name_follows_type() {
        assert_eq!(client().provider_name(), "groq");
    }

    #[test]
    fn test_chat_request_with_system() {
        let request = LlmRequest::new("Question?", "llama-3.1-8b-instant")
            .with_system("Answer from context")
            .with_temperature(0.0);

        let body = serde_json::to_value(client().to_chat_request(&request, true)).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Question?");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["stream"], true);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_chat_request_without_system() {
        let request = LlmRequest::new("Q", "m");
        let chat = client().to_chat_request(&request, false);
        assert_eq!(chat.messages.len(), 1);
    }

    #[test]
    fn test_parse_delta() {
        let chunk = parse_delta(
            r#"{"model":"gpt-4o-mini","choices":[{"delta":{"content":"Par"},"finish_reason":null}]}"#,
            "fallback",
        )
        .unwrap();
        assert_eq!(chunk.content, "Par");
        assert_eq!(chunk.model, "gpt-4o-mini");
        assert!(!chunk.done);

        let chunk = parse_delta(
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":5,"completion_tokens":2}}"#,
            "fallback",
        )
        .unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.model, "fallback");
        assert_eq!(chunk.usage, Some(LlmUsage::new(5, 2)));
    }
}
