//! Recursive separator splitter.
//!
//! Text is cut into atoms by trying separators from coarsest to finest
//! (paragraphs, lines, sentences, then whitespace runs) until every atom fits
//! the size limit. Atoms are then packed greedily into chunks, and each new
//! chunk starts with as many trailing atoms of the previous one as the overlap
//! limit allows.

use super::ChunkSplitter;
use crate::chunk::ChunkOptions;
use ragline_core::AppResult;

const SEPARATORS: &[&str] = &["\n\n", "\n", ". "];

pub struct RecursiveSplitter;

impl ChunkSplitter for RecursiveSplitter {
    fn name(&self) -> &'static str {
        "recursive"
    }

    fn spans(&self, text: &str, options: &ChunkOptions) -> AppResult<Vec<(usize, usize)>> {
        Ok(spans(text, &options.clamped()))
    }
}

/// Expects `options` to be clamped.
pub(crate) fn spans(text: &str, options: &ChunkOptions) -> Vec<(usize, usize)> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut atoms = Vec::new();
    split_range(text, (0, text.len()), 0, options.max_chars, &mut atoms);
    merge(text, &atoms, options)
}

fn char_len(text: &str, (start, end): (usize, usize)) -> usize {
    text[start..end].chars().count()
}

fn split_range(
    text: &str,
    range: (usize, usize),
    level: usize,
    max_chars: usize,
    out: &mut Vec<(usize, usize)>,
) {
    if char_len(text, range) <= max_chars {
        out.push(range);
        return;
    }

    let (start, end) = range;
    match SEPARATORS.get(level) {
        Some(separator) => {
            for (s, e) in split_inclusive(&text[start..end], separator) {
                split_range(text, (start + s, start + e), level + 1, max_chars, out);
            }
        }
        None => {
            for (s, e, whitespace) in token_runs(&text[start..end]) {
                let run = (start + s, start + e);
                if whitespace && char_len(text, run) > max_chars {
                    split_by_chars(text, run, max_chars, out);
                } else {
                    out.push(run);
                }
            }
        }
    }
}

/// Pieces ending right after each separator occurrence, plus the remainder.
fn split_inclusive(text: &str, separator: &str) -> Vec<(usize, usize)> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for (i, _) in text.match_indices(separator) {
        let end = i + separator.len();
        pieces.push((last, end));
        last = end;
    }
    if last < text.len() {
        pieces.push((last, text.len()));
    }
    pieces
}

/// Alternating runs of whitespace and non-whitespace characters.
fn token_runs(text: &str) -> Vec<(usize, usize, bool)> {
    let mut runs: Vec<(usize, usize, bool)> = Vec::new();
    for (i, c) in text.char_indices() {
        let whitespace = c.is_whitespace();
        let end = i + c.len_utf8();
        match runs.last_mut() {
            Some(run) if run.2 == whitespace => run.1 = end,
            _ => runs.push((i, end, whitespace)),
        }
    }
    runs
}

fn split_by_chars(
    text: &str,
    (start, end): (usize, usize),
    max_chars: usize,
    out: &mut Vec<(usize, usize)>,
) {
    let mut piece_start = start;
    let mut count = 0;
    for (i, _) in text[start..end].char_indices() {
        if count == max_chars {
            out.push((piece_start, start + i));
            piece_start = start + i;
            count = 0;
        }
        count += 1;
    }
    out.push((piece_start, end));
}

fn merge(text: &str, atoms: &[(usize, usize)], options: &ChunkOptions) -> Vec<(usize, usize)> {
    let lens: Vec<usize> = atoms.iter().map(|atom| char_len(text, *atom)).collect();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < atoms.len() {
        let mut j = i;
        let mut size = lens[i];
        while j + 1 < atoms.len() && size + lens[j + 1] <= options.max_chars {
            j += 1;
            size += lens[j];
        }
        spans.push((atoms[i].0, atoms[j].1));

        if j + 1 >= atoms.len() {
            break;
        }

        // Smallest k in (i, j + 1] whose tail i.e. atoms k..=j fits the overlap
        // limit and still leaves room for atom j + 1.
        let next = lens[j + 1];
        let mut tail = size;
        let mut k = i;
        loop {
            tail -= lens[k];
            k += 1;
            if k > j || (tail <= options.overlap && tail + next <= options.max_chars) {
                break;
            }
        }
        i = k;
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(text: &str, max: usize, overlap: usize) -> Vec<&str> {
        spans(text, &ChunkOptions::new(max, overlap).clamped())
            .into_iter()
            .map(|(s, e)| &text[s..e])
            .collect()
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(chunks("Hello world.", 500, 50), vec!["Hello world."]);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        assert_eq!(
            chunks(text, 30, 0),
            vec!["First paragraph here.\n\n", "Second paragraph here."]
        );
    }

    #[test]
    fn test_sentences_inside_long_paragraph() {
        let text = "One two three. Four five six. Seven eight nine.";
        let result = chunks(text, 20, 0);
        assert_eq!(
            result,
            vec!["One two three. ", "Four five six. ", "Seven eight nine."]
        );
    }

    #[test]
    fn test_overlap_repeats_trailing_words() {
        let text = "aa bb cc dd ee ff gg hh";
        let result = chunks(text, 8, 3);
        assert_eq!(result[0], "aa bb cc");
        assert!(result[1].starts_with(" cc") || result[1].starts_with("cc"));
        for pair in result.windows(2) {
            assert!(pair[0].chars().count() <= 8);
            assert!(pair[1].chars().count() <= 8);
        }
    }

    #[test]
    fn test_oversize_token_stays_whole() {
        let text = "tiny supercalifragilisticexpialidocious end";
        let result = chunks(text, 10, 2);
        assert!(result.contains(&"supercalifragilisticexpialidocious"));
        for chunk in result {
            let count = chunk.chars().count();
            assert!(count <= 10 || !chunk.contains(char::is_whitespace));
        }
    }

    #[test]
    fn test_long_whitespace_run_is_split() {
        let text = format!("a{}b", " ".repeat(25));
        for chunk in chunks(&text, 10, 0) {
            assert!(chunk.chars().count() <= 10);
        }
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let text = "é".repeat(12);
        let result = chunks(&text, 12, 0);
        assert_eq!(result, vec![text.as_str()]);
    }

    #[test]
    fn test_token_runs() {
        assert_eq!(
            token_runs("ab  c"),
            vec![(0, 2, false), (2, 4, true), (4, 5, false)]
        );
    }
}
