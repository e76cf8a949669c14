//! Response routing for pending requests.
//!
//! This module provides the ResponseRouter which tracks pending requests
//! and completes their waiters via oneshot channels.
//!
//! - Before sending a request, register it via `register(id)` to get a oneshot Receiver
//! - The Reader Task calls `route(id, outcome)` when a response arrives
//! - The requester awaits the Receiver without holding any lock
//!
//! Every completion path (`route`, `remove`, `fail_request`, `close`) takes
//! the entry out of the table under the lock, so a request is completed at
//! most once and a late response finds nothing to complete.

use std::collections::HashMap;
use std::time::Instant;

use log::debug;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::bridge::protocol::{RequestId, ResponseError};
use crate::error::{BridgeError, BridgeResult, LockResultExt};

/// What a waiter eventually receives.
pub type CallOutcome = Result<Value, BridgeError>;

/// Result of routing one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteResult {
    /// The waiter received the outcome.
    Delivered,
    /// No pending request with this ID (late, duplicate or unsolicited).
    Unknown,
    /// The entry existed but its waiter had already gone away.
    ReceiverDropped,
}

/// One in-flight call.
struct PendingRequest {
    tx: oneshot::Sender<CallOutcome>,
    method: String,
    created_at: Instant,
}

/// Routes responses to pending requests via oneshot channels.
///
/// Thread-safe: registration happens on caller tasks, routing on the reader
/// task, and removal on timeout or teardown.
pub struct ResponseRouter {
    /// All router state protected by a single mutex.
    state: std::sync::Mutex<RouterState>,
}

struct RouterState {
    pending: HashMap<RequestId, PendingRequest>,
    /// Set once the connection is gone; later registrations are refused.
    closed: bool,
}

impl Default for ResponseRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseRouter {
    /// Create a new empty ResponseRouter.
    pub fn new() -> Self {
        Self {
            state: std::sync::Mutex::new(RouterState {
                pending: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Register a pending request and return a receiver for its outcome.
    ///
    /// Must be called before the request is written.
    ///
    /// # Errors
    /// - `ConnectionClosed` if the router has been closed
    /// - `Io` if the ID is already pending
    pub fn register(
        &self,
        id: RequestId,
        method: &str,
    ) -> BridgeResult<oneshot::Receiver<CallOutcome>> {
        let mut state = self.state.lock().recover_poison("ResponseRouter::register");

        if state.closed {
            return Err(BridgeError::ConnectionClosed);
        }
        if state.pending.contains_key(&id) {
            return Err(BridgeError::Io(std::io::Error::other(format!(
                "duplicate request ID {}",
                id
            ))));
        }

        let (tx, rx) = oneshot::channel();
        state.pending.insert(
            id,
            PendingRequest {
                tx,
                method: method.to_string(),
                created_at: Instant::now(),
            },
        );
        Ok(rx)
    }

    /// Complete the pending request with this ID from a response.
    ///
    /// An error descriptor becomes `BridgeError::Remote`.
    pub fn route(&self, id: RequestId, outcome: Result<Value, ResponseError>) -> RouteResult {
        let entry = {
            let mut state = self.state.lock().recover_poison("ResponseRouter::route");
            state.pending.remove(&id)
        };

        let Some(entry) = entry else {
            return RouteResult::Unknown;
        };

        debug!(
            target: "tweetbridge::bridge::router",
            "Response for id={} ({}) after {:?}",
            id,
            entry.method,
            entry.created_at.elapsed()
        );

        match entry.tx.send(outcome.map_err(BridgeError::Remote)) {
            Ok(()) => RouteResult::Delivered,
            Err(_) => RouteResult::ReceiverDropped,
        }
    }

    /// Remove a pending request without completing it.
    ///
    /// Used by the caller itself on timeout. Returns `true` if it was pending.
    pub fn remove(&self, id: RequestId) -> bool {
        let mut state = self.state.lock().recover_poison("ResponseRouter::remove");
        state.pending.remove(&id).is_some()
    }

    /// Fail one pending request (e.g. its write failed).
    pub fn fail_request(&self, id: RequestId, error: BridgeError) -> bool {
        let entry = {
            let mut state = self.state.lock().recover_poison("ResponseRouter::fail_request");
            state.pending.remove(&id)
        };
        match entry {
            Some(entry) => {
                let _ = entry.tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Close the router: fail every pending request with `ConnectionClosed`
    /// and refuse further registrations.
    ///
    /// Returns how many requests were failed. Safe to call repeatedly.
    pub fn close(&self) -> usize {
        let entries: Vec<_> = {
            let mut state = self.state.lock().recover_poison("ResponseRouter::close");
            state.closed = true;
            state.pending.drain().collect()
        };

        // Lock released before completing waiters
        let count = entries.len();
        for (_, entry) in entries {
            let _ = entry.tx.send(Err(BridgeError::ConnectionClosed));
        }
        count
    }

    /// Get the number of pending requests.
    pub fn pending_count(&self) -> usize {
        let state = self.state.lock().recover_poison("ResponseRouter::pending_count");
        state.pending.len()
    }
}
