//! Response classification for messages read from the subordinate process.
//!
//! The subordinate writes three kinds of JSON objects on its stdout:
//! responses to our requests, notifications (or requests) of its own, and
//! anything else. Only responses take part in correlation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request_id::RequestId;

/// Error descriptor carried by an error response.
///
/// `{"message": <string>, "code": <int>?, "data": <any>?}`. Unknown members
/// are ignored; a missing `code` is tolerated since the remote side does not
/// always send one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// JSON-RPC error code, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Human-readable error message, surfaced verbatim
    pub message: String,
    /// Optional additional error data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    /// Interpret an arbitrary `error` member.
    ///
    /// Objects with a string `message` deserialize directly; anything else is
    /// kept whole as the message text so nothing the remote said is lost.
    pub fn from_value(error: Value) -> Self {
        match serde_json::from_value::<ResponseError>(error.clone()) {
            Ok(parsed) => parsed,
            Err(_) => Self {
                code: None,
                message: match error {
                    Value::String(text) => text,
                    other => other.to_string(),
                },
                data: None,
            },
        }
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A parsed inbound JSON object, classified for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Response to one of our requests.
    Response {
        id: RequestId,
        outcome: Result<Value, ResponseError>,
    },
    /// Server-initiated notification or request (has a `method`).
    Notification { method: String },
    /// Valid JSON that is not part of the protocol.
    Other,
}

impl InboundMessage {
    /// Classify a parsed JSON value.
    ///
    /// A non-null `error` wins over `result` when both are present. A lone
    /// `"error": null` resolves with `null`; an `id` with neither member is
    /// not a response.
    pub fn classify(mut message: Value) -> Self {
        if let Some(method) = message.get("method").and_then(Value::as_str) {
            return Self::Notification {
                method: method.to_string(),
            };
        }

        let Some(id) = RequestId::from_json(&message) else {
            return Self::Other;
        };

        let Some(object) = message.as_object_mut() else {
            return Self::Other;
        };

        let has_error_member = object.contains_key("error");
        let error = object.remove("error").filter(|e| !e.is_null());
        let result = object.remove("result");

        match (error, result) {
            (Some(error), _) => Self::Response {
                id,
                outcome: Err(ResponseError::from_value(error)),
            },
            (None, Some(result)) => Self::Response {
                id,
                outcome: Ok(result),
            },
            (None, None) if has_error_member => Self::Response {
                id,
                outcome: Ok(Value::Null),
            },
            (None, None) => Self::Other,
        }
    }

    /// Whether this is a response carrying a non-error result.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Response { outcome: Ok(_), .. })
    }
}
