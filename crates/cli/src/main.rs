//! Blotter CLI — the main entry point.
//!
//! Commands:
//! - `serve`  — Start the HTTP gateway
//! - `chat`   — Interactive chat or single-message mode
//! - `index`  — Index a document or re-index the ledger
//! - `config` — Show the effective configuration

use clap::{Parser, Subcommand};

mod app;
mod commands;

#[derive(Parser)]
#[command(
    name = "blotter",
    about = "Blotter — conversational trade-ledger assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a config file (defaults to blotter.toml if present)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Index a document into the policy collection, or re-index the ledger
    Index {
        /// Path to a text file to chunk and index
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => blotter_config::AppConfig::load_from(std::path::Path::new(path))?,
        None => blotter_config::AppConfig::load()?,
    };

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Chat { message } => commands::chat::run(config, message).await?,
        Commands::Index { file } => commands::index::run(config, file).await?,
        Commands::Config => commands::config_cmd::run(config)?,
    }

    Ok(())
}
