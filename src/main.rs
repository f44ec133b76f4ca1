use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ragbot::{app, cli, config};

#[derive(Parser)]
#[command(name = "ragbot", version, about = "Local RAG chatbot with a weather tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the interactive chat (default)
    Chat,
    /// Get the current weather for a city without the chat model
    Weather {
        /// City name, e.g. "Sofia"
        city: String,
    },
    /// Inspect the geo-coordinate cache
    Geo {
        #[command(subcommand)]
        action: GeoAction,
    },
    /// Check the memory database and configuration
    Doctor,
}

#[derive(Subcommand)]
enum GeoAction {
    /// Resolve a city and show which tier answered
    Resolve {
        /// City name, e.g. "Sofia"
        city: String,
    },
    /// List persisted coordinates
    List {
        /// Only show rows saved for this exact city name
        #[arg(long)]
        city: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::RagbotConfig::load()?;

    // Log to stderr so stdout carries only the conversation.
    let filter =
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => app::run_chat(config).await?,
        Command::Weather { city } => cli::weather::weather(config, &city).await?,
        Command::Geo { action } => match action {
            GeoAction::Resolve { city } => cli::geo::resolve(config, &city).await?,
            GeoAction::List { city } => cli::geo::list(config, city.as_deref()).await?,
        },
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
