//! Error handling types for tweetbridge
//!
//! This module provides the error type shared by the bridge, the capability
//! layer and the command-line front end.

use std::sync::PoisonError;
use std::time::Duration;

use thiserror::Error;

use crate::bridge::protocol::{RequestId, ResponseError};

/// Comprehensive error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// `connect` did not reach `Connected` in time; the subordinate process
    /// has already been terminated when this is returned.
    #[error("connection timeout after {timeout:?}")]
    ConnectionTimeout { timeout: Duration },

    /// A single call did not receive its response in time.
    ///
    /// The connection stays usable for other calls.
    #[error("request {id} timed out after {timeout:?}")]
    RequestTimeout { id: RequestId, timeout: Duration },

    /// The subordinate answered with an explicit error descriptor.
    #[error("{0}")]
    Remote(ResponseError),

    /// The connection closed before the call completed.
    #[error("connection closed")]
    ConnectionClosed,

    /// A call was issued outside the `Connected` state.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called while a session is already active.
    #[error("already connected")]
    AlreadyConnected,

    /// The subordinate process could not be started
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid or unreadable configuration
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Helper trait to recover the guard from a poisoned std lock.
pub trait LockResultExt<T> {
    /// Return the guard even if another thread panicked while holding it.
    ///
    /// The context parameter names the operation that hit the poisoned lock.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "tweetbridge::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

impl BridgeError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        BridgeError::Config {
            message: message.into(),
        }
    }

    /// Whether this error was caused by a timeout (connect or request).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            BridgeError::ConnectionTimeout { .. } | BridgeError::RequestTimeout { .. }
        )
    }
}
