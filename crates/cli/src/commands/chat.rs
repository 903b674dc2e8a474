//! Interactive chat loop.
//!
//! Checks credentials, brings the index up to date, then answers questions
//! until the user quits. Retrieval and generation failures are reported and
//! the loop carries on; anything else ends the session.

use super::{env_lookup, log_startup, print_sources, print_token};
use clap::Args;
use ragline_core::{config::AppConfig, AppError, AppResult};
use ragline_knowledge::{start_session, KnowledgeConfig, Session};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "ragline> ";

/// Chat with your documents (default)
#[derive(Args, Debug, Default)]
pub struct ChatCommand {
    /// Print each answer once it is complete instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Do not list sources after each answer
    #[arg(long)]
    pub no_sources: bool,
}

fn is_exit(line: &str) -> bool {
    matches!(line.to_lowercase().as_str(), "quit" | "exit")
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig, knowledge: &KnowledgeConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let session = start_session(&config.workspace, config, knowledge, env_lookup).await?;
        log_startup(&session);

        let mut editor = DefaultEditor::new()
            .map_err(|e| AppError::Other(format!("Failed to start line editor: {}", e)))?;

        println!(
            "Loaded {} documents into '{}'. Ask a question, or type 'quit' to leave.",
            session.documents, knowledge.collection
        );

        loop {
            let line = match editor.readline(PROMPT) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(AppError::Other(format!("Failed to read input: {}", e))),
            };

            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if is_exit(query) {
                break;
            }
            if let Err(e) = editor.add_history_entry(query) {
                tracing::debug!("History not updated: {}", e);
            }

            match self.respond(&session, query).await {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(kind = e.kind(), "Query failed: {}", e);
                    eprintln!("[{}] {}", e.kind(), e);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!("Chat session ended");
        Ok(())
    }

    async fn respond(&self, session: &Session, query: &str) -> AppResult<()> {
        let answer = if self.no_stream {
            let answer = session.assistant.answer(query).await?;
            println!("{}", answer.text);
            answer
        } else {
            let answer = session.assistant.answer_stream(query, print_token).await?;
            println!();
            answer
        };

        if !self.no_sources {
            print_sources(&answer);
        }
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("quit"));
        assert!(is_exit("EXIT"));
        assert!(!is_exit("quit smoking tips"));
        assert!(!is_exit("q"));
    }
}
