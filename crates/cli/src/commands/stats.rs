//! Stats command handler.
//!
//! Summarizes what the index currently holds.

use super::print_json;
use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{KnowledgeConfig, VectorIndex};

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig, knowledge: &KnowledgeConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index = VectorIndex::open(&config.workspace, knowledge)?;
        let stats = index.stats().await?;

        if self.json {
            return print_json(&stats);
        }

        println!("Collection: {}", stats.collection);
        println!("Backend:    {}", stats.backend);
        println!("Sources:    {}", stats.sources);
        println!("Chunks:     {}", stats.chunks);
        println!(
            "Embeddings: {}",
            stats.embedding.as_deref().unwrap_or("(none yet)")
        );
        Ok(())
    }
}
