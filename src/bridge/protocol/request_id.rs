//! JSON-RPC request ID type for bridge communication.
//!
//! This module provides a type-safe wrapper for request IDs, preventing
//! confusion with other integer types.

use std::fmt;

/// JSON-RPC request ID.
///
/// Wraps `i64` so that the pending-request table and the wire format agree on
/// one representation. Only numeric IDs are produced, since this side of the
/// connection generates every ID itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(i64);

impl RequestId {
    /// Create a new RequestId from an i64 value.
    #[inline]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying i64 value.
    #[inline]
    pub fn as_i64(self) -> i64 {
        self.0
    }

    /// Extract RequestId from a JSON-RPC message.
    ///
    /// Returns `None` if the "id" field is missing, null or not an integer.
    pub fn from_json(message: &serde_json::Value) -> Option<Self> {
        message.get("id")?.as_i64().map(Self)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RequestId> for i64 {
    fn from(id: RequestId) -> Self {
        id.0
    }
}
