//! Request builders for the subordinate process.
//!
//! Every request carries an object as `params`, including the parameterless
//! `tools/list`, which is sent with an empty object.

use serde::Serialize;
use serde_json::{Map, Value};

use super::request_id::RequestId;

/// Parameter mapping carried by every request.
pub type Params = Map<String, Value>;

/// Method that lists the capabilities exposed by the subordinate.
pub const TOOLS_LIST_METHOD: &str = "tools/list";

/// Method that invokes one capability by name.
pub const TOOLS_CALL_METHOD: &str = "tools/call";

/// A JSON-RPC 2.0 request as written on the wire.
///
/// Field order matches the wire layout:
/// `{"jsonrpc":"2.0","id":<int>,"method":<string>,"params":<object>}`.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Identifier used to correlate the response.
    pub id: i64,
    /// The method to invoke.
    pub method: String,
    /// Parameter object.
    pub params: Params,
}

impl JsonRpcRequest {
    /// Build a request with the given id.
    pub fn new(id: RequestId, method: impl Into<String>, params: Params) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.as_i64(),
            method: method.into(),
            params,
        }
    }

    /// Encode as a single JSON line (no trailing newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Build the params object for a `tools/call` request.
///
/// `{"name": <capability>, "arguments": <mapping>}`
pub fn build_tools_call_params(name: &str, arguments: Params) -> Params {
    let mut params = Params::new();
    params.insert("name".to_string(), Value::String(name.to_string()));
    params.insert("arguments".to_string(), Value::Object(arguments));
    params
}
