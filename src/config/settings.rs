//! Configuration types.
//!
//! [`SettingsLayer`] is what one source (file, environment, CLI) provides;
//! every field is optional. Layers are merged and then resolved into a
//! [`ClientSettings`] with all values filled in.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::{DEFAULT_ACTOR, DEFAULT_COMMAND, TOKEN_ENV_VAR};
use crate::bridge::{
    ConnectionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, SubordinateCommand,
};
use crate::error::{BridgeError, BridgeResult};
use crate::search::{DEFAULT_MAX_ITEMS, DEFAULT_QUERY_TYPE};

/// Authorization token. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// One configuration source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub command: Vec<String>,
    pub actor: String,
    /// Capability name used for searches
    pub tool: String,
    pub token: Option<Token>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub readiness_probe: bool,
    pub max_items: u32,
    pub query_type: String,
}

/// Capability name the subordinate registers for an actor.
///
/// `owner/name` becomes `owner-slash-name`.
pub fn tool_name_for_actor(actor: &str) -> String {
    actor.replace('/', "-slash-")
}

impl TryFrom<SettingsLayer> for ClientSettings {
    type Error = BridgeError;

    fn try_from(layer: SettingsLayer) -> BridgeResult<Self> {
        let command = layer
            .command
            .unwrap_or_else(|| DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect());
        if command.is_empty() {
            return Err(BridgeError::config("command must not be empty"));
        }

        let actor = layer.actor.unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        let tool = layer.tool.unwrap_or_else(|| tool_name_for_actor(&actor));

        let request_timeout = positive_secs(
            "request_timeout_secs",
            layer.request_timeout_secs,
            DEFAULT_REQUEST_TIMEOUT,
        )?;
        let connect_timeout = positive_secs(
            "connect_timeout_secs",
            layer.connect_timeout_secs,
            DEFAULT_CONNECT_TIMEOUT,
        )?;

        Ok(Self {
            command,
            actor,
            tool,
            token: layer.token,
            request_timeout,
            connect_timeout,
            readiness_probe: layer.readiness_probe.unwrap_or(true),
            max_items: layer.max_items.unwrap_or(DEFAULT_MAX_ITEMS),
            query_type: layer
                .query_type
                .unwrap_or_else(|| DEFAULT_QUERY_TYPE.to_string()),
        })
    }
}

fn positive_secs(field: &str, secs: Option<u64>, default: Duration) -> BridgeResult<Duration> {
    match secs {
        None => Ok(default),
        Some(0) => Err(BridgeError::config(format!("{} must be positive", field))),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

impl ClientSettings {
    /// Command line for the subordinate: `command... --actors <actor>`, with
    /// the token (if any) in its environment.
    pub fn subordinate_command(&self) -> SubordinateCommand {
        let mut argv = self.command.clone();
        argv.push("--actors".to_string());
        argv.push(self.actor.clone());

        let command = SubordinateCommand::new(argv);
        match &self.token {
            Some(token) => command.with_env(TOKEN_ENV_VAR, token.expose()),
            None => command,
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.subordinate_command())
            .with_request_timeout(self.request_timeout)
            .with_connect_timeout(self.connect_timeout)
            .with_readiness_probe(self.readiness_probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_layer;
    use rstest::rstest;

    #[test]
    fn defaults_resolve_to_documented_values() {
        let settings = ClientSettings::try_from(default_layer()).unwrap();

        assert_eq!(settings.command, vec!["npx", "-y", "@apify/actors-mcp-server"]);
        assert_eq!(
            settings.tool,
            "kaitoeasyapi-slash-twitter-x-data-tweet-scraper-pay-per-result-cheapest"
        );
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.connect_timeout, Duration::from_secs(15));
        assert!(settings.readiness_probe);
        assert_eq!(settings.max_items, 10);
        assert_eq!(settings.query_type, "Latest");
        assert_eq!(settings.token, None);
    }

    #[test]
    fn explicit_tool_overrides_derived_name() {
        let layer = SettingsLayer {
            actor: Some("me/scraper".to_string()),
            tool: Some("custom".to_string()),
            ..Default::default()
        };
        assert_eq!(ClientSettings::try_from(layer).unwrap().tool, "custom");
    }

    #[rstest]
    #[case::empty_command(SettingsLayer { command: Some(vec![]), ..Default::default() })]
    #[case::zero_request_timeout(SettingsLayer { request_timeout_secs: Some(0), ..Default::default() })]
    #[case::zero_connect_timeout(SettingsLayer { connect_timeout_secs: Some(0), ..Default::default() })]
    fn invalid_layers_are_rejected(#[case] layer: SettingsLayer) {
        assert!(matches!(
            ClientSettings::try_from(layer),
            Err(BridgeError::Config { .. })
        ));
    }

    #[test]
    fn subordinate_command_appends_actor_and_token_env() {
        let layer = SettingsLayer {
            command: Some(vec!["mcp-server".to_string()]),
            actor: Some("me/scraper".to_string()),
            token: Some(Token::new("secret")),
            ..Default::default()
        };
        let command = ClientSettings::try_from(layer).unwrap().subordinate_command();

        assert_eq!(command.argv, vec!["mcp-server", "--actors", "me/scraper"]);
        assert_eq!(
            command.env,
            vec![("APIFY_TOKEN".to_string(), "secret".to_string())]
        );
    }

    #[test]
    fn debug_output_hides_token() {
        let layer = SettingsLayer {
            token: Some(Token::new("super-secret")),
            ..Default::default()
        };
        let settings = ClientSettings::try_from(layer.clone()).unwrap();

        assert!(!format!("{:?}", layer).contains("super-secret"));
        assert!(!format!("{:?}", settings).contains("super-secret"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed = toml::from_str::<SettingsLayer>("max_itmes = 3");
        assert!(parsed.is_err());
    }
}
