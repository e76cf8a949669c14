//! Programmed defaults, the lowest configuration layer.

use super::settings::SettingsLayer;
use crate::bridge::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use crate::search::{DEFAULT_MAX_ITEMS, DEFAULT_QUERY_TYPE};

/// Environment variable carrying the authorization token, both for our own
/// configuration and for the subordinate process.
pub const TOKEN_ENV_VAR: &str = "APIFY_TOKEN";

/// Subordinate program and its leading arguments.
pub const DEFAULT_COMMAND: [&str; 3] = ["npx", "-y", "@apify/actors-mcp-server"];

/// Scraper actor exposed by the subordinate.
pub const DEFAULT_ACTOR: &str = "kaitoeasyapi/twitter-x-data-tweet-scraper-pay-per-result-cheapest";

/// Returns the default layer with every field set except `token` and `tool`
/// (the tool name is derived from the actor).
pub fn default_layer() -> SettingsLayer {
    SettingsLayer {
        command: Some(DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()),
        actor: Some(DEFAULT_ACTOR.to_string()),
        tool: None,
        token: None,
        request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT.as_secs()),
        connect_timeout_secs: Some(DEFAULT_CONNECT_TIMEOUT.as_secs()),
        readiness_probe: Some(true),
        max_items: Some(DEFAULT_MAX_ITEMS),
        query_type: Some(DEFAULT_QUERY_TYPE.to_string()),
    }
}
