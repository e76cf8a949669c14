pub mod bridge;
mod capability;
pub mod cli;
pub mod config;
pub mod error;
pub mod search;

// Re-export the main client types
pub use bridge::{
    Connection, ConnectionConfig, ConnectionEvent, ConnectionState, DisconnectReason,
    SubordinateCommand,
};
pub use config::ClientSettings;
pub use error::{BridgeError, BridgeResult};
pub use search::{SearchOptions, TweetSearch};
