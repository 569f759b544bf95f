//! rulegen CLI
//!
//! Turns natural-language business rules into validated JSON Logic,
//! grounded in a vocabulary of data keys and optional policy documents.

mod commands;
mod context;

use clap::{Parser, Subcommand};
use commands::{
    GenerateCommand, IndexCommand, KeysCommand, MapCommand, RetrieveCommand, ValidateCommand,
};
use context::AppContext;
use rulegen_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// rulegen - natural-language business rules to JSON Logic
#[derive(Parser, Debug)]
#[command(name = "rulegen")]
#[command(about = "Generate and validate JSON Logic rules", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List vocabulary keys
    Keys(KeysCommand),

    /// Map a statement's phrases to vocabulary keys
    Map(MapCommand),

    /// Retrieve policy context for a query
    Retrieve(RetrieveCommand),

    /// Validate a JSON Logic rule document
    Validate(ValidateCommand),

    /// Generate a rule from a natural-language statement
    Generate(GenerateCommand),

    /// Vocabulary index management
    Index(IndexCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Keys(_) => "keys",
            Commands::Map(_) => "map",
            Commands::Retrieve(_) => "retrieve",
            Commands::Validate(_) => "validate",
            Commands::Generate(_) => "generate",
            Commands::Index(_) => "index",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, then YAML, then environment, then flags
    let config = AppConfig::load_from(cli.workspace, cli.config)?
        .with_overrides(cli.log_level, cli.verbose, cli.no_color);

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;
    config.validate()?;

    tracing::info!("rulegen starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Embedding: {} ({}), index: {}, llm: {} ({})",
        config.embedding.provider,
        config.embedding.model,
        config.vector_store.kind,
        config.llm.provider,
        config.llm.model
    );

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let ctx = AppContext::new(config).await?;

    let result = match &cli.command {
        Commands::Keys(cmd) => cmd.execute(&ctx).await,
        Commands::Map(cmd) => cmd.execute(&ctx).await,
        Commands::Retrieve(cmd) => cmd.execute(&ctx).await,
        Commands::Validate(cmd) => cmd.execute(&ctx).await,
        Commands::Generate(cmd) => cmd.execute(&ctx).await,
        Commands::Index(cmd) => cmd.execute(&ctx).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
