//! Lifecycle notifications for connection observers.
//!
//! Observers subscribe through [`Connection::subscribe`](super::Connection::subscribe)
//! and receive events over a tokio broadcast channel.

/// Capacity of the lifecycle broadcast channel.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `disconnect()` was called
    Requested,
    /// The subordinate closed its stdout (normally: it exited)
    ProcessExited,
    /// Reading the subordinate's stdout failed
    ReadError(String),
    /// `connect()` gave up (timeout or early exit)
    ConnectFailed,
}

/// A lifecycle change of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The session reached `Connected`.
    Connected,
    /// The session was torn down. Emitted exactly once per session.
    Disconnected {
        reason: DisconnectReason,
        /// Pending calls that were failed with `ConnectionClosed`
        failed_requests: usize,
    },
}
