//! Google Gemini provider (`generateContent` API).

use super::{error_for_status, line_stream, sse_data};
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use futures::StreamExt;
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "google";

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GeminiResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }

    fn finished(&self) -> bool {
        self.candidates
            .first()
            .map(|c| c.finish_reason.is_some())
            .unwrap_or(false)
    }

    fn usage(&self) -> Option<LlmUsage> {
        self.usage_metadata
            .as_ref()
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
    }
}

/// Gemini LLM client.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_gemini_request(&self, request: &LlmRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system.as_ref().map(|system| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system.clone(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    async fn send(&self, request: &LlmRequest, url: String) -> AppResult<reqwest::Response> {
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.to_gemini_request(request))
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to send request to Gemini: {}", e)))?;

        error_for_status(response, "Gemini").await
    }
}

fn parse_event(data: &str, fallback_model: &str) -> AppResult<LlmStreamChunk> {
    let parsed: GeminiResponse = serde_json::from_str(data)
        .map_err(|e| AppError::Generation(format!("Failed to parse Gemini chunk: {}", e)))?;

    Ok(LlmStreamChunk {
        content: parsed.text(),
        done: parsed.finished(),
        usage: parsed.usage(),
        model: parsed
            .model_version
            .unwrap_or_else(|| fallback_model.to_string()),
    })
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Gemini");
        tracing::debug!("Request: {:?}", request);

        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let response = self.send(request, url).await?;
        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse Gemini response: {}", e)))?;

        if parsed.candidates.is_empty() {
            return Err(AppError::Generation(
                "Gemini returned no candidates".to_string(),
            ));
        }

        tracing::info!("Received completion from Gemini");
        Ok(LlmResponse {
            content: parsed.text(),
            usage: parsed.usage().unwrap_or_default(),
            model: parsed
                .model_version
                .unwrap_or_else(|| request.model.clone()),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to Gemini");

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );
        let response = self.send(request, url).await?;
        let model = request.model.clone();
        let chunks = line_stream(response.bytes_stream(), PROVIDER).filter_map(move |line| {
            let chunk = match line {
                Ok(line) => sse_data(&line).map(|data| parse_event(data, &model)),
                Err(e) => Some(Err(e)),
            };
            futures::future::ready(chunk)
        });

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_request_shape() {
        let client = GeminiClient::new("https://example.test/v1beta/", "k");
        assert_eq!(client.base_url, "https://example.test/v1beta");

        let request = LlmRequest::new("Q", "gemini-2.0-flash")
            .with_system("S")
            .with_temperature(0.0)
            .with_max_tokens(256);
        let body = serde_json::to_value(client.to_gemini_request(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Q");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "S");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn test_parse_event_joins_parts() {
        let chunk = parse_event(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]},"finishReason":"STOP"}],
                "usageMetadata":{"promptTokenCount":7,"candidatesTokenCount":2}}"#,
            "gemini-2.0-flash",
        )
        .unwrap();

        assert_eq!(chunk.content, "Hello");
        assert!(chunk.done);
        assert_eq!(chunk.model, "gemini-2.0-flash");
        assert_eq!(chunk.usage, Some(LlmUsage::new(7, 2)));
    }
}
