//! Capability operations layered on [`Connection::call`].
//!
//! Both operations return the subordinate's `result` unmodified.

use serde_json::Value;

use crate::bridge::Connection;
use crate::bridge::protocol::{Params, TOOLS_CALL_METHOD, TOOLS_LIST_METHOD, build_tools_call_params};
use crate::error::BridgeResult;

impl Connection {
    /// List the capabilities the subordinate exposes (`tools/list`).
    pub async fn list_capabilities(&self) -> BridgeResult<Value> {
        self.call(TOOLS_LIST_METHOD, Params::new()).await
    }

    /// Invoke one capability by name (`tools/call`).
    pub async fn invoke_capability(&self, name: &str, arguments: Params) -> BridgeResult<Value> {
        log::debug!(
            target: "tweetbridge::capability",
            "Invoking {} with {} argument(s)",
            name,
            arguments.len()
        );
        self.call(TOOLS_CALL_METHOD, build_tools_call_params(name, arguments))
            .await
    }
}
