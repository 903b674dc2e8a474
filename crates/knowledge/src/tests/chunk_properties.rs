//! Properties of the recursive chunker over a spread of inputs.

use crate::chunk::chunk_spans;

fn samples() -> Vec<String> {
    vec![
        String::new(),
        "one".to_string(),
        "A short sentence.".to_string(),
        "First paragraph.\n\nSecond paragraph has more words in it.\n\nThird.".to_string(),
        "Line one\nLine two\nLine three\nLine four\nLine five\n".to_string(),
        "Sentence one. Sentence two. Sentence three. Sentence four. ".repeat(8),
        "Gamedex é um aplicativo 🎮 brasileiro para gerenciar jogos! ".repeat(5),
        format!("start{}end", " ".repeat(70)),
        format!("tiny {} tail", "x".repeat(90)),
        "  leading and trailing whitespace  \n\n\n".to_string(),
        "日本語のテキストはスペースを含みません。".repeat(6),
    ]
}

const SIZES: &[(usize, usize)] = &[(1, 0), (5, 2), (20, 0), (20, 5), (64, 16), (500, 50)];

fn reconstruct(text: &str, spans: &[(usize, usize)]) -> String {
    let mut out = String::new();
    let mut prev_end = 0;
    for &(start, end) in spans {
        assert!(start <= prev_end, "gap before span {}..{}", start, end);
        out.push_str(&text[prev_end..end]);
        prev_end = end;
    }
    out
}

#[test]
fn test_overlap_removed_reconstructs_text() {
    for text in samples() {
        for &(max, overlap) in SIZES {
            let spans = chunk_spans(&text, max, overlap);
            assert_eq!(
                reconstruct(&text, &spans),
                text,
                "max={} overlap={}",
                max,
                overlap
            );
        }
    }
}

#[test]
fn test_spans_cover_text_and_advance() {
    for text in samples() {
        for &(max, overlap) in SIZES {
            let spans = chunk_spans(&text, max, overlap);
            if text.is_empty() {
                assert!(spans.is_empty());
                continue;
            }

            assert_eq!(spans[0].0, 0);
            assert_eq!(spans.last().map(|s| s.1), Some(text.len()));
            for pair in spans.windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                assert!(next.0 > prev.0);
                assert!(next.1 > prev.1);
            }
        }
    }
}

#[test]
fn test_size_and_overlap_limits() {
    for text in samples() {
        for &(max, overlap) in SIZES {
            let spans = chunk_spans(&text, max, overlap);
            for &(start, end) in &spans {
                let chunk = &text[start..end];
                if chunk.chars().count() > max {
                    assert!(
                        !chunk.contains(char::is_whitespace),
                        "oversize chunk {:?} is not a single token",
                        chunk
                    );
                }
            }

            let effective_overlap = overlap.min(max.saturating_sub(1));
            for pair in spans.windows(2) {
                let shared = &text[pair[1].0..pair[0].1];
                assert!(shared.chars().count() <= effective_overlap);
            }
        }
    }
}
