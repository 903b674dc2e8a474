//! RAG answering orchestration.
//!
//! Retrieves the most similar chunks, renders them into the answer prompt
//! and asks the LLM to answer from that context only.

use crate::index::VectorIndex;
use crate::rag::types::{sources_for, Answer, FallbackPolicy, RagOptions};
use crate::types::SearchResult;
use futures::StreamExt;
use ragline_core::{AppError, AppResult};
use ragline_llm::{LlmClient, LlmRequest, LlmUsage};
use ragline_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct Assistant {
    index: Arc<VectorIndex>,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    options: RagOptions,
}

/// LLM failures surface as generation errors whatever their origin.
fn generation_error(err: AppError) -> AppError {
    match err {
        AppError::Generation(_) => err,
        other => AppError::Generation(other.to_string()),
    }
}

impl Assistant {
    pub fn new(
        index: Arc<VectorIndex>,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        options: RagOptions,
    ) -> Self {
        Self {
            index,
            llm,
            prompt,
            options,
        }
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn options(&self) -> &RagOptions {
        &self.options
    }

    /// Search and apply `min_score`, falling back per policy when nothing
    /// usable comes back.
    async fn retrieve(&self, query: &str) -> AppResult<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(AppError::Retrieval("query must not be empty".to_string()));
        }

        let allow_empty = self.options.fallback == FallbackPolicy::AnswerWithoutContext;

        let results = match self.index.search(query, self.options.top_k).await {
            Ok(results) => results,
            Err(AppError::Retrieval(message)) if allow_empty && self.index.is_empty().await? => {
                warn!("Answering without context: {}", message);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let retrieved = results.len();
        let results: Vec<SearchResult> = match self.options.min_score {
            Some(min) => results.into_iter().filter(|r| r.score >= min).collect(),
            None => results,
        };

        if results.is_empty() {
            let message = format!(
                "no relevant chunks found ({} retrieved, all below minScore {:.2})",
                retrieved,
                self.options.min_score.unwrap_or(0.0)
            );
            if allow_empty {
                warn!("Answering without context: {}", message);
            } else {
                return Err(AppError::Retrieval(message));
            }
        }

        info!(
            "Retrieved {} chunks (top score {:.3})",
            results.len(),
            results.first().map(|r| r.score).unwrap_or(0.0)
        );
        Ok(results)
    }

    /// Context is chunk texts in rank order joined by the prompt's separator.
    fn build_request(&self, query: &str, results: &[SearchResult]) -> AppResult<LlmRequest> {
        let context = results
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(&self.prompt.context.chunk_separator);

        let mut variables = HashMap::new();
        variables.insert("context".to_string(), context);
        variables.insert("question".to_string(), query.to_string());
        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, self.options.model.clone()).with_temperature(0.0);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = self.options.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        debug!(
            "Built prompt {} ({} chars of context)",
            self.prompt.id,
            request.prompt.len()
        );
        Ok(request)
    }

    /// Answer `query` from the indexed documents.
    #[instrument(skip(self, query), fields(provider = %self.llm.provider_name()))]
    pub async fn answer(&self, query: &str) -> AppResult<Answer> {
        let results = self.retrieve(query).await?;
        let request = self.build_request(query, &results)?;

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(generation_error)?;

        Ok(Answer {
            text: response.content,
            sources: sources_for(&results),
            results,
            provider: self.llm.provider_name().to_string(),
            model: response.model,
            usage: response.usage,
        })
    }

    /// Like [`answer`](Self::answer), calling `on_token` for each piece of
    /// text as it arrives.
    #[instrument(skip(self, query, on_token), fields(provider = %self.llm.provider_name()))]
    pub async fn answer_stream<F>(&self, query: &str, mut on_token: F) -> AppResult<Answer>
    where
        F: FnMut(&str),
    {
        let results = self.retrieve(query).await?;
        let request = self.build_request(query, &results)?.with_streaming();

        let mut stream = self
            .llm
            .stream(&request)
            .await
            .map_err(generation_error)?;

        let mut text = String::new();
        let mut model = request.model.clone();
        let mut usage = LlmUsage::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(generation_error)?;
            if !chunk.content.is_empty() {
                on_token(&chunk.content);
                text.push_str(&chunk.content);
            }
            if !chunk.model.is_empty() {
                model = chunk.model;
            }
            if let Some(chunk_usage) = chunk.usage {
                usage = chunk_usage;
            }
        }

        Ok(Answer {
            text,
            sources: sources_for(&results),
            results,
            provider: self.llm.provider_name().to_string(),
            model,
            usage,
        })
    }
}
