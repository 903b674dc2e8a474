//! LLM provider implementations.

pub mod gemini;
pub mod ollama;
pub mod openai;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiCompatClient;

use futures::{Stream, StreamExt};
use ragline_core::{AppError, AppResult};

/// Re-split a streamed HTTP body into complete, trimmed, non-empty lines.
///
/// Network chunks do not respect line boundaries, so bytes are buffered until
/// a newline arrives. A trailing line without a newline is flushed when the
/// body ends.
pub(crate) fn line_stream<S, B>(
    body: S,
    provider: &'static str,
) -> impl Stream<Item = AppResult<String>> + Send
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    body.map(Some)
        .chain(futures::stream::once(async { None }))
        .scan(Vec::<u8>::new(), move |buffer, item| {
            let lines: Vec<AppResult<String>> = match item {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(bytes.as_ref());
                    let mut lines = Vec::new();
                    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                        let raw: Vec<u8> = buffer.drain(..=pos).collect();
                        let line = String::from_utf8_lossy(&raw).trim().to_string();
                        if !line.is_empty() {
                            lines.push(Ok(line));
                        }
                    }
                    lines
                }
                Some(Err(e)) => vec![Err(AppError::Generation(format!(
                    "{} stream error: {}",
                    provider, e
                )))],
                None => {
                    let rest = std::mem::take(buffer);
                    let line = String::from_utf8_lossy(&rest).trim().to_string();
                    if line.is_empty() {
                        Vec::new()
                    } else {
                        vec![Ok(line)]
                    }
                }
            };
            futures::future::ready(Some(futures::stream::iter(lines)))
        })
        .flatten()
}

/// Payload of a server-sent event line, or `None` for comments and other
/// fields. `[DONE]` markers are also dropped.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        None
    } else {
        Some(data)
    }
}

/// Turn a non-success HTTP response into a generation error.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
    provider: &str,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::Generation(format!(
        "{} API error ({}): {}",
        provider, status, error_text
    )))
}
