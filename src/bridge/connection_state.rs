//! Connection state machine for the subordinate process.

use std::fmt;

/// State of a [`Connection`](super::Connection).
///
/// Transitions:
/// - Disconnected -> Connecting (on `connect`)
/// - Connecting -> Connected (first successful result or readiness probe)
/// - any -> Disconnected (on `disconnect`, process exit or connect failure)
///
/// Calls are only accepted in `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No subordinate process (initial and terminal state)
    #[default]
    Disconnected,
    /// Process spawned, waiting for readiness
    Connecting,
    /// Ready for calls
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}
