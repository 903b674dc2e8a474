//! The provider-neutral completion interface.
//!
//! Every backend turns an [`LlmRequest`] into either one [`LlmResponse`] or
//! an [`LlmStream`] of incremental chunks whose last item is marked `done`.

use futures::Stream;
use ragline_core::AppResult;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A single-turn completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRequest {
    /// Rendered user message, context included
    pub prompt: String,

    pub model: String,

    /// Instructions sent ahead of the user message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub stream: bool,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system: None,
            max_tokens: None,
            temperature: None,
            stream: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sampling temperature; answers from context use 0.0.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// A finished completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    pub content: String,

    /// Model name as reported by the provider
    pub model: String,

    pub usage: LlmUsage,

    /// False when the provider stopped early (length limit, filter)
    pub done: bool,
}

/// Token counts reported by the provider. Zero when it reports none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// One increment of a streamed completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmStreamChunk {
    /// Text added by this increment; may be empty
    pub content: String,

    pub model: String,

    #[serde(default)]
    pub done: bool,

    /// Present on the final chunk when the provider reports usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<LlmUsage>,
}

impl From<LlmResponse> for LlmStreamChunk {
    fn from(response: LlmResponse) -> Self {
        Self {
            content: response.content,
            model: response.model,
            done: true,
            usage: Some(response.usage),
        }
    }
}

pub type LlmStream = Pin<Box<dyn Stream<Item = AppResult<LlmStreamChunk>> + Send>>;

/// A chat model backend.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Lowercase provider id, e.g. "openai" or "ollama".
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;

    /// Streamed completion. Backends without incremental output yield the
    /// whole completion as a single final chunk.
    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let chunk = LlmStreamChunk::from(self.complete(request).await?);
        Ok(Box::pin(futures::stream::once(async move { Ok(chunk) })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct EchoClient;

    #[async_trait::async_trait]
    impl LlmClient for EchoClient {
        fn provider_name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            Ok(LlmResponse {
                content: format!("echo: {}", request.prompt),
                model: request.model.clone(),
                usage: LlmUsage::new(3, 2),
                done: true,
            })
        }
    }

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("Hi", "gpt-4o-mini")
            .with_system("Answer from the context")
            .with_temperature(0.0)
            .with_max_tokens(64)
            .with_streaming();

        assert_eq!(request.system.as_deref(), Some("Answer from the context"));
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(64));
        assert!(request.stream);
    }

    #[test]
    fn test_usage_serializes_camel_case() {
        let json = serde_json::to_value(LlmUsage::new(10, 5)).unwrap();
        assert_eq!(json["promptTokens"], 10);
        assert_eq!(json["completionTokens"], 5);
        assert_eq!(json["totalTokens"], 15);
    }

    #[tokio::test]
    async fn test_default_stream_yields_single_chunk() {
        let request = LlmRequest::new("ping", "m");
        let chunks: Vec<_> = EchoClient.stream(&request).await.unwrap().collect().await;

        assert_eq!(chunks.len(), 1);
        let chunk = chunks.into_iter().next().unwrap().unwrap();
        assert_eq!(chunk.content, "echo: ping");
        assert!(chunk.done);
        assert_eq!(chunk.usage.unwrap().total_tokens, 5);
    }
}
