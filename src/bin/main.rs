use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tweetbridge::cli;
use tweetbridge::config::{SettingsLayer, Token, load_settings};

/// Search Twitter/X through a stdio JSON-RPC tool server
#[derive(Parser)]
#[command(name = "tweetbridge")]
#[command(version)]
#[command(about = "Search Twitter/X through a stdio JSON-RPC tool server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file layered over the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Authorization token (defaults to $APIFY_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Maximum number of tweets to request
    #[arg(long, global = true)]
    max_items: Option<u32>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one search and print the results
    Search {
        /// The query (e.g. "from:nasa", "rust lang")
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// List the capabilities the server exposes
    Tools,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    let overrides = SettingsLayer {
        token: cli.token.map(Token::new),
        max_items: cli.max_items,
        ..Default::default()
    };
    let settings = match load_settings(cli.config.as_deref(), overrides) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match cli.command {
        Some(Commands::Search { query }) => cli::run_search(&settings, &query.join(" ")).await,
        Some(Commands::Tools) => cli::run_tools(&settings).await,
        None => cli::run_interactive(&settings).await,
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
