//! Command-line front end.
//!
//! One [`Connection`] is created per invocation and owned by the running
//! command; every path ends with `disconnect`.

pub mod display;
pub mod query;

use std::io::Write;

use log::{debug, info};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::bridge::{Connection, ConnectionEvent};
use crate::config::{ClientSettings, TOKEN_ENV_VAR};
use crate::error::{BridgeError, BridgeResult};
use crate::search::TweetSearch;
use query::{Input, SearchRequest, classify_query};

const PROMPT: &str = "\nEnter your search query (or command): ";

/// Refuse to spawn the subordinate without a token.
pub fn require_token(settings: &ClientSettings) -> BridgeResult<()> {
    if settings.token.is_some() {
        return Ok(());
    }
    Err(BridgeError::config(format!(
        "a token is required: set {} or pass --token",
        TOKEN_ENV_VAR
    )))
}

/// Spawn the subordinate and wait until it is ready.
pub async fn open_connection(settings: &ClientSettings) -> BridgeResult<Connection> {
    require_token(settings)?;
    let connection = Connection::new(settings.connection_config());
    connection.connect().await?;
    Ok(connection)
}

/// Run one query through the matching search wrapper.
pub async fn perform_search(
    connection: &Connection,
    settings: &ClientSettings,
    query: &str,
) -> BridgeResult<Value> {
    let search = TweetSearch::new(connection, settings.tool.clone())
        .with_max_items(settings.max_items)
        .with_query_type(settings.query_type.clone());

    let request = classify_query(query);
    let options = request.options();
    match request {
        SearchRequest::User { handle } => {
            println!("Searching tweets from @{}...", handle);
            search.search_tweets_by_user(&handle, options).await
        }
        SearchRequest::Terms { terms } => {
            println!("Using advanced search terms...");
            search.search_tweets_by_terms(&terms, options).await
        }
        SearchRequest::Text { query, .. } => {
            println!("Searching for tweets containing: {}", query);
            search.search_tweets(&query, options).await
        }
    }
}

/// `tweetbridge search <query>`
pub async fn run_search(settings: &ClientSettings, query: &str) -> BridgeResult<()> {
    let connection = open_connection(settings).await?;
    let outcome = perform_search(&connection, settings, query).await;
    connection.disconnect().await;
    print!("{}", display::render(&outcome?));
    Ok(())
}

/// `tweetbridge tools`
pub async fn run_tools(settings: &ClientSettings) -> BridgeResult<()> {
    let connection = open_connection(settings).await?;
    let outcome = connection.list_capabilities().await;
    connection.disconnect().await;
    println!("{}", serde_json::to_string_pretty(&outcome?)?);
    Ok(())
}

/// Interactive loop: read queries from stdin until `quit`, EOF or Ctrl-C.
pub async fn run_interactive(settings: &ClientSettings) -> BridgeResult<()> {
    clear_screen();
    print_help();

    println!("Initializing client...");
    let connection = open_connection(settings).await?;
    match connection.list_capabilities().await {
        Ok(tools) => debug!(
            target: "tweetbridge::cli",
            "Available capabilities: {}",
            tools
        ),
        Err(e) => {
            connection.disconnect().await;
            return Err(e);
        }
    }
    println!("Client ready!");

    let outcome = repl(&connection, settings).await;
    println!("Disconnecting from server...");
    connection.disconnect().await;
    println!("Goodbye!");
    outcome
}

async fn repl(connection: &Connection, settings: &ClientSettings) -> BridgeResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut events = connection.subscribe();

    loop {
        prompt();
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
            closed = wait_for_disconnect(&mut events) => return Err(closed),
            line = lines.next_line() => line?,
        };

        // EOF on stdin
        let Some(line) = line else {
            return Ok(());
        };

        match Input::parse(&line) {
            Input::Quit => return Ok(()),
            Input::Help => print_help(),
            Input::Clear => {
                clear_screen();
                print_help();
            }
            Input::Empty => println!("Please enter a search query or command"),
            Input::Search(query) => {
                let outcome = tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        println!();
                        return Ok(());
                    }
                    outcome = perform_search(connection, settings, &query) => outcome,
                };
                match outcome {
                    Ok(result) => print!("{}", display::render(&result)),
                    Err(BridgeError::ConnectionClosed) => return Err(BridgeError::ConnectionClosed),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
        }
    }
}

/// Resolves when the session is torn down underneath the loop.
async fn wait_for_disconnect(events: &mut broadcast::Receiver<ConnectionEvent>) -> BridgeError {
    loop {
        match events.recv().await {
            Ok(ConnectionEvent::Disconnected { reason, .. }) => {
                info!(
                    target: "tweetbridge::cli",
                    "Subordinate went away: {:?}",
                    reason
                );
                return BridgeError::ConnectionClosed;
            }
            Ok(ConnectionEvent::Connected) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return BridgeError::ConnectionClosed,
        }
    }
}

fn prompt() {
    print!("{}", PROMPT);
    let _ = std::io::stdout().flush();
}

fn clear_screen() {
    print!("\x1B[2J\x1B[H");
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("\nTwitter search over a stdio tool server");
    println!("{}", "=".repeat(50));
    println!("Commands:");
    println!("  help, h     - Show this help message");
    println!("  quit, q     - Exit the application");
    println!("  clear, c    - Clear the screen");
    println!("  <message>   - Send a search query");
    println!();
    println!("Search Examples:");
    println!("  artificial intelligence     - Tweets about AI");
    println!("  from:elonmusk               - Tweets from @elonmusk");
    println!("  @nasa                       - Tweets from @nasa");
    println!("  bitcoin OR cryptocurrency   - Search with OR operator");
    println!();
    println!("Advanced Examples:");
    println!("  bitcoin since:2024-01-01_00:00:00_UTC until:2024-12-31_23:59:59_UTC");
    println!("  AI min_faves:100            - AI tweets with 100+ likes");
}
