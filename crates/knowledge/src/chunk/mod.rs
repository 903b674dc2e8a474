//! Document chunking.
//!
//! Splitters produce byte spans over the source text. Consecutive spans may
//! overlap but never leave gaps, so dropping each span's overlap with its
//! predecessor and concatenating the rest reproduces the input exactly.

mod metadata;
pub mod splitters;

pub use metadata::{calculate_hash, chunk_id};
pub use splitters::{ChunkSplitter, RecursiveSplitter, SemanticSplitter};

use crate::document::Document;
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// A chunk of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier derived from source id and index
    pub id: String,

    /// Id of the document this chunk belongs to
    pub source_id: String,

    /// Position within the document (0-indexed)
    pub index: u32,

    /// Chunk text content
    pub text: String,

    /// Byte offset of the first byte in the document content
    pub start: usize,

    /// Byte offset one past the last byte
    pub end: usize,

    /// SHA-256 of `text`
    pub hash: String,
}

impl Chunk {
    pub fn new(source_id: &str, index: u32, text: String, span: (usize, usize)) -> Self {
        Self {
            id: chunk_id(source_id, index),
            source_id: source_id.to_string(),
            index,
            hash: calculate_hash(&text),
            text,
            start: span.0,
            end: span.1,
        }
    }
}

/// Splitting strategy selectable in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Separator hierarchy: paragraphs, lines, sentences, words
    #[default]
    Recursive,
    /// Unicode-aware semantic levels via `text-splitter`
    Semantic,
}

impl ChunkingStrategy {
    pub fn splitter(&self) -> Box<dyn ChunkSplitter> {
        match self {
            Self::Recursive => Box::new(RecursiveSplitter),
            Self::Semantic => Box::new(SemanticSplitter),
        }
    }
}

/// Chunk size limits, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_chars: 500,
            overlap: 50,
        }
    }
}

impl ChunkOptions {
    pub fn new(max_chars: usize, overlap: usize) -> Self {
        Self { max_chars, overlap }
    }

    /// Reject sizes that cannot produce progress.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_chars == 0 {
            return Err(AppError::Config(
                "chunkSize must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.max_chars {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.overlap, self.max_chars
            )));
        }
        Ok(())
    }

    /// Limits forced into a usable range: size at least 1, overlap below size.
    pub(crate) fn clamped(&self) -> Self {
        let max_chars = self.max_chars.max(1);
        Self {
            max_chars,
            overlap: self.overlap.min(max_chars - 1),
        }
    }
}

/// Split `text` into overlapping chunks of at most `max_chunk_size` characters.
///
/// A chunk is only longer than the limit when it is a single
/// whitespace-free token that does not fit.
pub fn chunk_text(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<String> {
    chunk_spans(text, max_chunk_size, overlap)
        .into_iter()
        .map(|(start, end)| text[start..end].to_string())
        .collect()
}

/// Byte spans of the chunks [`chunk_text`] would return.
pub fn chunk_spans(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    splitters::recursive::spans(text, &ChunkOptions::new(max_chunk_size, overlap).clamped())
}

/// Chunk a document with the given splitter.
///
/// Whitespace-only spans are not emitted; indices of the remaining chunks keep
/// their span position so chunk ids stay stable.
pub fn chunk_document(
    document: &Document,
    splitter: &dyn ChunkSplitter,
    options: &ChunkOptions,
) -> AppResult<Vec<Chunk>> {
    let spans = splitter.spans(&document.content, options)?;

    let chunks: Vec<Chunk> = spans
        .into_iter()
        .enumerate()
        .filter(|(_, (start, end))| !document.content[*start..*end].trim().is_empty())
        .map(|(index, (start, end))| {
            Chunk::new(
                &document.id,
                index as u32,
                document.content[start..end].to_string(),
                (start, end),
            )
        })
        .collect();

    tracing::debug!(
        "{} splitter created {} chunks from {} ({} bytes)",
        splitter.name(),
        chunks.len(),
        document.id,
        document.content.len()
    );

    Ok(chunks)
}

/// 1-based line range covered by a byte span.
pub fn line_range(content: &str, start: usize, end: usize) -> (usize, usize) {
    let first = content[..start].matches('\n').count() + 1;
    let last = first + content[start..end].trim_end().matches('\n').count();
    (first, last)
}
