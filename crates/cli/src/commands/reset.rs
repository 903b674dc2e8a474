//! Reset command handler.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{KnowledgeConfig, VectorIndex};

/// Delete every chunk in the collection
#[derive(Args, Debug)]
pub struct ResetCommand {}

impl ResetCommand {
    pub async fn execute(&self, config: &AppConfig, knowledge: &KnowledgeConfig) -> AppResult<()> {
        tracing::info!("Executing reset command");

        let index = VectorIndex::open(&config.workspace, knowledge)?;
        let removed = index.stats().await?.chunks;
        index.reset().await?;

        println!(
            "Removed {} chunks from '{}'",
            removed, knowledge.collection
        );
        Ok(())
    }
}
