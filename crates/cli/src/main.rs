//! Nugget CLI: the main entry point.
//!
//! Commands:
//! - `chat`    : Interactive chat or single-message mode
//! - `ingest`  : Index a JSON file of scraped restaurants
//! - `history` : Show or clear the saved conversation
//! - `suggest` : Print sample questions
//! - `config`  : Show the effective configuration (or `--defaults`)

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "nugget",
    about = "Nugget — your restaurant assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.nugget/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat about restaurants
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Your name, used in the greeting
        #[arg(long)]
        name: Option<String>,
    },

    /// Index a JSON array of restaurant records
    Ingest {
        /// Path to the scraped restaurant file
        file: PathBuf,

        /// Drop previously indexed documents first
        #[arg(long)]
        replace: bool,
    },

    /// Show or clear the saved conversation
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Print sample questions to get started
    Suggest,

    /// Show the effective configuration
    Config {
        /// Print a starter config.toml with every default instead
        #[arg(long)]
        defaults: bool,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print the saved turns
    Show,
    /// Delete the saved conversation
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat { message, name } => commands::chat::run(&config, message, name).await?,
        Commands::Ingest { file, replace } => commands::ingest::run(&config, &file, replace).await?,
        Commands::History { action } => match action {
            HistoryAction::Show => commands::history::show(&config)?,
            HistoryAction::Clear => commands::history::clear(&config)?,
        },
        Commands::Suggest => commands::suggest::run(),
        Commands::Config { defaults: true } => commands::config_cmd::defaults(),
        Commands::Config { defaults: false } => {
            commands::config_cmd::show(&config, cli.config.as_deref())?
        }
    }

    Ok(())
}
