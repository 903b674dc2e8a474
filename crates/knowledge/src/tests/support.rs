//! Test doubles shared by the knowledge tests.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::store::MemoryStore;
use async_trait::async_trait;
use ragline_core::{AppError, AppResult};
use ragline_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn memory_index() -> VectorIndex {
    VectorIndex::new(
        Arc::new(MemoryStore::new()),
        Arc::new(TrigramProvider::new(384)),
    )
}

enum Script {
    /// Reply with the rendered prompt
    Echo,
    /// Reply with fixed text
    Fixed(String),
    /// Reply with the context section of the prompt
    Extractive,
}

/// Deterministic LLM that records the last request it saw.
pub struct ScriptedLlm {
    script: Script,
    last: Mutex<Option<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn echo() -> Self {
        Self::with(Script::Echo)
    }

    pub fn fixed(text: &str) -> Self {
        Self::with(Script::Fixed(text.to_string()))
    }

    pub fn extractive() -> Self {
        Self::with(Script::Extractive)
    }

    fn with(script: Script) -> Self {
        Self {
            script,
            last: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.last.lock().unwrap().clone()
    }

    fn reply(&self, request: &LlmRequest) -> String {
        *self.last.lock().unwrap() = Some(request.clone());
        match &self.script {
            Script::Echo => request.prompt.clone(),
            Script::Fixed(text) => text.clone(),
            Script::Extractive => {
                let after = request
                    .prompt
                    .split_once("Context:")
                    .map(|(_, rest)| rest)
                    .unwrap_or("");
                after
                    .split_once("Question:")
                    .map(|(context, _)| context)
                    .unwrap_or(after)
                    .trim()
                    .to_string()
            }
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        Ok(LlmResponse {
            content: self.reply(request),
            model: request.model.clone(),
            usage: LlmUsage::new(3, 2),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let text = self.reply(request);
        let model = request.model.clone();
        let mut chunks: Vec<AppResult<LlmStreamChunk>> = text
            .split_inclusive(' ')
            .map(|piece| {
                Ok(LlmStreamChunk {
                    content: piece.to_string(),
                    model: model.clone(),
                    done: false,
                    usage: None,
                })
            })
            .collect();
        chunks.push(Ok(LlmStreamChunk {
            content: String::new(),
            model,
            done: true,
            usage: Some(LlmUsage::new(3, 2)),
        }));
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// LLM whose every call fails with a transport-style error.
pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Other("connection reset by peer".to_string()))
    }
}

/// Trigram embedder that counts `embed_batch` calls.
#[derive(Debug)]
pub struct CountingEmbedder {
    inner: TrigramProvider,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self {
            inner: TrigramProvider::new(384),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}
