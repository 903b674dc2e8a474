//! Search command handler.

use super::print_json;
use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{KnowledgeConfig, SourceRef, VectorIndex};

/// Show the chunks most similar to a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of chunks to return (default: retrieval.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig, knowledge: &KnowledgeConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let top_k = self.top_k.unwrap_or(knowledge.retrieval.top_k);
        let index = VectorIndex::open(&config.workspace, knowledge)?;
        let results = index.search(&self.query, top_k).await?;

        if self.json {
            return print_json(&results);
        }

        for (rank, result) in results.iter().enumerate() {
            let source = SourceRef::from_result(result);
            println!(
                "{}. {} ({}) score {:.3}",
                rank + 1,
                source.source,
                source.location,
                result.score
            );
            println!("   {}", source.snippet);
        }
        Ok(())
    }
}
