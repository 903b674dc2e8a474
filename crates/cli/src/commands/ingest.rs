//! Ingest command handler.
//!
//! Brings the index in line with the corpus without talking to an LLM.

use super::print_json;
use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{load_corpus, KnowledgeConfig, VectorIndex};

/// Index the documents in the data directory
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Clear the collection before indexing
    #[arg(long)]
    pub reset: bool,

    /// Output statistics as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig, knowledge: &KnowledgeConfig) -> AppResult<()> {
        tracing::info!(
            "Executing ingest command for {:?}",
            knowledge.data_path(&config.workspace)
        );

        let documents = load_corpus(&config.workspace, knowledge)?;
        let index = VectorIndex::open(&config.workspace, knowledge)?;

        if self.reset {
            index.reset().await?;
            tracing::info!("Cleared collection '{}'", knowledge.collection);
        }

        let stats = index.sync(&documents).await?;

        if self.json {
            return print_json(&stats);
        }

        println!(
            "Indexed {} documents into '{}': {} chunks ({} embedded, {} unchanged, {} pruned)",
            stats.documents,
            knowledge.collection,
            stats.chunks_total,
            stats.embedded,
            stats.unchanged,
            stats.pruned
        );
        Ok(())
    }
}
