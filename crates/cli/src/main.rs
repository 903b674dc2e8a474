//! ragline CLI
//!
//! Chat with a directory of documents: the corpus is chunked, embedded and
//! indexed locally, and answers come from an LLM grounded in the closest
//! chunks.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, ChatCommand, IngestCommand, ResetCommand, SearchCommand, StatsCommand,
};
use ragline_core::{config::AppConfig, logging, AppResult, Overrides};
use ragline_knowledge::KnowledgeConfig;
use std::path::PathBuf;

/// ragline - answer questions from your own documents
#[derive(Parser, Debug)]
#[command(name = "ragline")]
#[command(about = "Retrieval-augmented answers from a local document corpus", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGLINE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file (default: .ragline/config.yaml)
    #[arg(short, long, global = true, env = "RAGLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of documents to index (default: data/)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, groq, gemini, perplexity, ollama)
    #[arg(short, long, global = true, env = "RAGLINE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "RAGLINE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with your documents (default)
    Chat(ChatCommand),

    /// Index the documents in the data directory
    Ingest(IngestCommand),

    /// Answer one question and exit
    Ask(AskCommand),

    /// Show the chunks most similar to a query
    Search(SearchCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Delete every chunk in the collection
    Reset(ResetCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Chat(_) => "chat",
            Commands::Ingest(_) => "ingest",
            Commands::Ask(_) => "ask",
            Commands::Search(_) => "search",
            Commands::Stats(_) => "stats",
            Commands::Reset(_) => "reset",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // .env must be in place before anything reads the environment
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = AppConfig::load(Overrides {
        workspace: cli.workspace,
        config_file: cli.config,
        provider: cli.provider,
        model: cli.model,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
    })?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("ragline starting");
    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {:?}", path);
    }
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {:?}", config.provider);
    tracing::debug!("Model: {:?}", config.model);

    config.validate()?;

    let mut knowledge = KnowledgeConfig::load(&config)?;
    if let Some(data) = cli.data {
        knowledge.data_dir = data;
    }

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Chat(ChatCommand::default()));
    let _span = tracing::info_span!("command", name = command.name()).entered();

    let result = match command {
        Commands::Chat(cmd) => cmd.execute(&config, &knowledge).await,
        Commands::Ingest(cmd) => cmd.execute(&config, &knowledge).await,
        Commands::Ask(cmd) => cmd.execute(&config, &knowledge).await,
        Commands::Search(cmd) => cmd.execute(&config, &knowledge).await,
        Commands::Stats(cmd) => cmd.execute(&config, &knowledge).await,
        Commands::Reset(cmd) => cmd.execute(&config, &knowledge).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!(kind = e.kind(), "Command failed: {}", e),
    }

    result
}
