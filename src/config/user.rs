//! Configuration file loading for tweetbridge.
//!
//! User config location: $XDG_CONFIG_HOME/tweetbridge/tweetbridge.toml
//! Fallback: the platform config directory from `dirs`
//! (e.g. ~/.config/tweetbridge/tweetbridge.toml on Linux)

use std::path::{Path, PathBuf};

use super::settings::SettingsLayer;
use crate::error::{BridgeError, BridgeResult};

const CONFIG_DIR_NAME: &str = "tweetbridge";
const CONFIG_FILE_NAME: &str = "tweetbridge.toml";

/// Returns the path to the user configuration file.
///
/// The path is determined by:
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/tweetbridge/tweetbridge.toml
/// 2. Otherwise: `dirs::config_dir()`/tweetbridge/tweetbridge.toml
///
/// Returns None if no config directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(xdg_config) if !xdg_config.is_empty() => PathBuf::from(xdg_config),
        _ => dirs::config_dir()?,
    };
    Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the user configuration file, if there is one.
pub fn load_user_config() -> BridgeResult<Option<SettingsLayer>> {
    match user_config_path() {
        Some(path) => load_config_file(&path),
        None => Ok(None),
    }
}

/// Load one TOML configuration file.
///
/// A missing file yields `Ok(None)`; an unreadable or unparsable file is a
/// `Config` error naming the path.
pub fn load_config_file(path: &Path) -> BridgeResult<Option<SettingsLayer>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!(
                target: "tweetbridge::config",
                "No config file at {}",
                path.display()
            );
            return Ok(None);
        }
        Err(e) => {
            return Err(BridgeError::config(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )));
        }
    };

    let layer = toml::from_str::<SettingsLayer>(&contents).map_err(|e| {
        BridgeError::config(format!("failed to parse {}: {}", path.display(), e))
    })?;
    log::debug!(
        target: "tweetbridge::config",
        "Loaded config from {}",
        path.display()
    );
    Ok(Some(layer))
}
