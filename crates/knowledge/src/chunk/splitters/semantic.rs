//! Semantic splitter using the text-splitter crate.

use super::ChunkSplitter;
use crate::chunk::ChunkOptions;
use ragline_core::{AppError, AppResult};
use text_splitter::{ChunkConfig, TextSplitter};

pub struct SemanticSplitter;

impl ChunkSplitter for SemanticSplitter {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn spans(&self, text: &str, options: &ChunkOptions) -> AppResult<Vec<(usize, usize)>> {
        let options = options.clamped();
        let config = ChunkConfig::new(options.max_chars)
            .with_overlap(options.overlap)
            .map_err(|e| AppError::Config(format!("Invalid chunk configuration: {}", e)))?
            .with_trim(false);

        let splitter = TextSplitter::new(config);
        Ok(splitter
            .chunk_indices(text)
            .map(|(offset, chunk)| (offset, offset + chunk.len()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_splitter_basic() {
        let text = "This is a test. ".repeat(100);
        let spans = SemanticSplitter
            .spans(&text, &ChunkOptions::new(200, 20))
            .unwrap();

        assert!(spans.len() > 1);
        assert_eq!(spans[0].0, 0);
        assert_eq!(spans.last().map(|s| s.1), Some(text.len()));
        for (start, end) in spans {
            assert!(text[start..end].chars().count() <= 200);
        }
    }

    #[test]
    fn test_semantic_splitter_empty() {
        let spans = SemanticSplitter
            .spans("", &ChunkOptions::default())
            .unwrap();
        assert!(spans.is_empty());
    }
}
