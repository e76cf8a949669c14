//! Layered configuration.
//!
//! Layers, lowest to highest precedence:
//! programmed defaults < user file < `--config` file < environment < CLI flags

pub mod defaults;
pub mod settings;
pub mod user;

use std::path::Path;

pub use defaults::{TOKEN_ENV_VAR, default_layer};
pub use settings::{ClientSettings, SettingsLayer, Token, tool_name_for_actor};
pub use user::{load_config_file, load_user_config, user_config_path};

use crate::error::BridgeResult;

/// Merge multiple layers in order.
/// Later layers in the slice have higher precedence (override earlier ones).
pub fn merge_all(layers: &[Option<SettingsLayer>]) -> SettingsLayer {
    layers
        .iter()
        .flatten()
        .cloned()
        .fold(SettingsLayer::default(), merge_layers)
}

/// Merge two layers, preferring values from `primary` over `fallback`.
pub fn merge_layers(fallback: SettingsLayer, primary: SettingsLayer) -> SettingsLayer {
    SettingsLayer {
        command: primary.command.or(fallback.command),
        actor: primary.actor.or(fallback.actor),
        tool: primary.tool.or(fallback.tool),
        token: primary.token.or(fallback.token),
        request_timeout_secs: primary.request_timeout_secs.or(fallback.request_timeout_secs),
        connect_timeout_secs: primary.connect_timeout_secs.or(fallback.connect_timeout_secs),
        readiness_probe: primary.readiness_probe.or(fallback.readiness_probe),
        max_items: primary.max_items.or(fallback.max_items),
        query_type: primary.query_type.or(fallback.query_type),
    }
}

/// Layer built from the process environment (`APIFY_TOKEN`).
pub fn environment_layer() -> Option<SettingsLayer> {
    let token = std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty())?;
    Some(SettingsLayer {
        token: Some(Token::new(token)),
        ..Default::default()
    })
}

/// Load and resolve settings from every layer.
///
/// `explicit_path` is the `--config` file; `overrides` carries CLI flags.
pub fn load_settings(
    explicit_path: Option<&Path>,
    overrides: SettingsLayer,
) -> BridgeResult<ClientSettings> {
    // Layer 1: Programmed defaults
    let defaults = Some(default_layer());

    // Layer 2: User config from XDG_CONFIG_HOME
    let user_config = load_user_config()?;

    // Layer 3: Explicit config file
    let explicit = match explicit_path {
        Some(path) => {
            let layer = load_config_file(path)?;
            if layer.is_none() {
                log::warn!(
                    target: "tweetbridge::config",
                    "Config file {} does not exist, ignoring",
                    path.display()
                );
            }
            layer
        }
        None => None,
    };

    // Layer 4: Environment
    let environment = environment_layer();

    // Layer 5: CLI flags
    let merged = merge_all(&[defaults, user_config, explicit, environment, Some(overrides)]);
    ClientSettings::try_from(merged)
}
