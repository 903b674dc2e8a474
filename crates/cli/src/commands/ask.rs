//! Ask command handler.
//!
//! Answers a single question from the corpus and exits.

use super::{env_lookup, log_startup, print_json, print_sources, print_token};
use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{start_session, KnowledgeConfig};

/// Answer one question from the documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Output the answer and its sources as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the answer as it is generated
    #[arg(long, conflicts_with = "json")]
    pub stream: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig, knowledge: &KnowledgeConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let session = start_session(&config.workspace, config, knowledge, env_lookup).await?;
        log_startup(&session);

        let answer = if self.stream {
            let answer = session
                .assistant
                .answer_stream(&self.question, print_token)
                .await?;
            println!();
            answer
        } else {
            session.assistant.answer(&self.question).await?
        };

        tracing::debug!(
            "Token usage - Prompt: {}, Completion: {}, Total: {}",
            answer.usage.prompt_tokens,
            answer.usage.completion_tokens,
            answer.usage.total_tokens
        );

        if self.json {
            let output = serde_json::json!({
                "answer": answer.text,
                "provider": answer.provider,
                "model": answer.model,
                "usage": answer.usage,
                "sources": answer.sources,
            });
            return print_json(&output);
        }

        if !self.stream {
            println!("{}", answer.text);
        }
        print_sources(&answer);
        Ok(())
    }
}
