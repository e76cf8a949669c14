//! Stdio bridge to a subordinate JSON-RPC process.
//!
//! This module spawns the subordinate, frames messages as newline-delimited
//! JSON, and correlates each request with its response by ID.
//!
//! # Module Structure
//!
//! - `transport` - process spawning, line framing and termination
//! - `protocol` - RequestId, request building and response classification
//! - `actor` - ResponseRouter plus the reader and writer tasks
//! - `connection` - Connection lifecycle (connect, call, disconnect)
//! - `connection_state` / `events` - state machine and lifecycle notifications

mod actor;
mod connection;
mod connection_state;
mod events;
pub mod protocol;
pub mod transport;

pub use connection::{
    Connection, ConnectionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
pub use connection_state::ConnectionState;
pub use events::{ConnectionEvent, DisconnectReason};
pub use transport::SubordinateCommand;
