//! Outbound message type for the writer loop.
//!
//! All requests pass through one queue so that concurrent callers never
//! interleave bytes on the subordinate's stdin.

use crate::bridge::protocol::RequestId;

/// Request to be written to the subordinate process.
///
/// The request_id must be registered with the ResponseRouter BEFORE queuing,
/// otherwise a fast response could arrive before its waiter exists.
#[derive(Debug)]
pub(crate) struct OutboundMessage {
    /// Encoded JSON line, without the trailing newline
    pub(crate) line: String,
    /// Request ID for correlation (already registered with router)
    pub(crate) request_id: RequestId,
}
