//! RAG answer types.

use crate::types::SearchResult;
use ragline_llm::LlmUsage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum snippet length for source references, in characters.
pub const MAX_SNIPPET_LENGTH: usize = 150;

/// Where part of an answer came from.
///
/// This is the user-facing representation: chunk ids, scores and byte
/// offsets stay internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Document id, e.g. "guides/tokenization.md"
    pub source: String,

    /// Human-readable location, e.g. "lines 12-34"
    pub location: String,

    /// Start of the chunk text, truncated on a word boundary
    pub snippet: String,
}

impl SourceRef {
    pub fn from_result(result: &SearchResult) -> Self {
        let location = match (
            result.metadata.get("line_start"),
            result.metadata.get("line_end"),
        ) {
            (Some(start), Some(end)) if start == end => format!("line {}", start),
            (Some(start), Some(end)) => format!("lines {}-{}", start, end),
            _ => format!("chunk {}", result.chunk.index),
        };

        Self {
            source: result.chunk.source_id.clone(),
            location,
            snippet: truncate_snippet(&result.chunk.text, MAX_SNIPPET_LENGTH),
        }
    }
}

/// Source references for `results`, deduplicated by (source, location) and
/// kept in rank order.
pub fn sources_for(results: &[SearchResult]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    results
        .iter()
        .map(SourceRef::from_result)
        .filter(|s| seen.insert((s.source.clone(), s.location.clone())))
        .collect()
}

/// Collapse whitespace and cut to `max_chars`, preferring a word boundary.
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= max_chars {
        return text;
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let truncated = &text[..cut];
    match truncated.rfind(' ') {
        Some(space) if space > 0 => format!("{}...", &truncated[..space]),
        _ => format!("{}...", truncated),
    }
}

/// What to do when retrieval yields nothing usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Report a retrieval error instead of answering
    #[default]
    Refuse,
    /// Ask the LLM with an empty context
    AnswerWithoutContext,
}

/// Per-query options for the assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct RagOptions {
    /// Model passed to the LLM client
    pub model: String,
    pub top_k: usize,
    pub min_score: Option<f32>,
    pub fallback: FallbackPolicy,
    pub max_tokens: Option<u32>,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            top_k: 3,
            min_score: None,
            fallback: FallbackPolicy::Refuse,
            max_tokens: None,
        }
    }
}

/// A generated answer with the retrieval that backed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,

    /// Chunks used as context, best first
    pub results: Vec<SearchResult>,

    pub sources: Vec<SourceRef>,

    pub provider: String,

    pub model: String,

    pub usage: LlmUsage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use std::collections::BTreeMap;

    fn result(source: &str, lines: Option<(usize, usize)>, text: &str) -> SearchResult {
        let mut metadata = BTreeMap::new();
        if let Some((start, end)) = lines {
            metadata.insert("line_start".to_string(), start.to_string());
            metadata.insert("line_end".to_string(), end.to_string());
        }
        SearchResult {
            chunk: Chunk::new(source, 2, text.to_string(), (0, text.len())),
            score: 0.5,
            metadata,
        }
    }

    #[test]
    fn test_location_formats() {
        assert_eq!(
            SourceRef::from_result(&result("a.md", Some((3, 9)), "x")).location,
            "lines 3-9"
        );
        assert_eq!(
            SourceRef::from_result(&result("a.md", Some((4, 4)), "x")).location,
            "line 4"
        );
        assert_eq!(
            SourceRef::from_result(&result("a.md", None, "x")).location,
            "chunk 2"
        );
    }

    #[test]
    fn test_sources_deduplicated_in_order() {
        let results = vec![
            result("b.md", Some((1, 2)), "first"),
            result("a.md", Some((1, 2)), "second"),
            result("b.md", Some((1, 2)), "first again"),
        ];
        let sources = sources_for(&results);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source, "b.md");
        assert_eq!(sources[1].source, "a.md");
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("Short\ntext", 100), "Short text");

        let long = "This is a very long text that needs to be truncated at some point";
        let result = truncate_snippet(long, 30);
        assert!(result.ends_with("..."));
        assert!(result.chars().count() <= 33);
        assert!(!result.contains("tru..."));
    }

    #[test]
    fn test_truncate_snippet_multibyte() {
        let text = "é".repeat(200);
        let result = truncate_snippet(&text, 150);
        assert_eq!(result.chars().count(), 153);
    }

    #[test]
    fn test_fallback_policy_names() {
        let policy: FallbackPolicy = serde_yaml::from_str("answer_without_context").unwrap();
        assert_eq!(policy, FallbackPolicy::AnswerWithoutContext);
        assert_eq!(FallbackPolicy::default(), FallbackPolicy::Refuse);
    }
}
