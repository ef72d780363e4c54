//! SignalScope CLI: the main entry point.
//!
//! Commands:
//! - `compact`  Compact a conversation history file
//! - `feed`     Build a merged signal feed from a fixture
//! - `rank`     Rank a fixture's feed for one user
//! - `config`   Show or initialize configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "signalscope",
    about = "SignalScope: context compaction and network signal feeds",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compact a JSON conversation history
    Compact(commands::compact::CompactArgs),

    /// Merge trigger events from a fixture into a feed
    Feed(commands::feed::FeedArgs),

    /// Rank a fixture's feed for a user
    Rank(commands::rank::RankArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
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
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compact(args) => commands::compact::run(args).await?,
        Commands::Feed(args) => commands::feed::run(args).await?,
        Commands::Rank(args) => commands::rank::run(args).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Init { force } => commands::config_cmd::init(force).await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}
