//! Command handlers for the ragline CLI.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod reset;
pub mod search;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use ingest::IngestCommand;
pub use reset::ResetCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;

use ragline_core::AppResult;
use ragline_knowledge::{Answer, Session};
use serde::Serialize;
use std::io::Write;

/// Credential and override lookup against the process environment.
pub(crate) fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Write a streamed piece of the answer without waiting for a newline.
pub(crate) fn print_token(token: &str) {
    let mut stdout = std::io::stdout().lock();
    // A closed stdout only loses output; the answer is still returned.
    let _ = stdout.write_all(token.as_bytes());
    let _ = stdout.flush();
}

pub(crate) fn print_sources(answer: &Answer) {
    if answer.sources.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for source in &answer.sources {
        println!("  - {} ({}): {}", source.source, source.location, source.snippet);
    }
}

pub(crate) fn log_startup(session: &Session) {
    let ingest = &session.ingest;
    tracing::info!(
        "Index ready: {} documents, {} chunks embedded, {} unchanged, {} pruned",
        session.documents,
        ingest.embedded,
        ingest.unchanged,
        ingest.pruned
    );
}
