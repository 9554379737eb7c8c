//! Config file loading.
//!
//! Files ending in `.toml` are parsed as TOML; anything else as JSON.

use std::path::Path;

use crate::{ConfigError, ConfigFile, Result};

/// Load a config file from `path`.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;

    if is_toml(path) {
        ConfigFile::from_toml(&contents).map_err(|e| ConfigError::ParseToml {
            path: path.display().to_string(),
            source: e,
        })
    } else {
        ConfigFile::from_json(&contents).map_err(|e| ConfigError::ParseJson {
            path: path.display().to_string(),
            source: e,
        })
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

impl ConfigFile {
    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
