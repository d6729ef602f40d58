use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::constants::DEFAULT_REMOTE;

pub const APP_NAME: &str = "gate";

fn config_dir() -> Option<PathBuf> {
    // Use ~/.config on both Linux and macOS (not ~/Library/Application Support)
    #[cfg(unix)]
    {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME")
            && !xdg_config_home.is_empty()
        {
            return Some(PathBuf::from(xdg_config_home).join(APP_NAME));
        }
        dirs::home_dir().map(|home| home.join(".config").join(APP_NAME))
    }
    #[cfg(windows)]
    {
        dirs::config_dir().map(|dir| dir.join(APP_NAME))
    }
}

fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Remote whose URL is recorded for main checkouts. For example:
    /// ```toml
    /// remote = "upstream"
    /// ```
    #[serde(default = "Config::default_remote")]
    pub remote: String,

    /// Discovery settings.
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    /// Directory names that are never descended into while scanning for
    /// repositories, in addition to `.git`. For example:
    /// ```toml
    /// [capture]
    /// skip_dirs = ["node_modules", "target"]
    /// ```
    #[serde(default)]
    pub skip_dirs: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: Self::default_remote(),
            capture: CaptureConfig::default(),
        }
    }
}

impl Config {
    fn default_remote() -> String {
        DEFAULT_REMOTE.to_string()
    }
}

pub fn load_config_from_str(s: &str) -> Result<Config> {
    let config: Config = toml::from_str(s)?;
    Ok(config)
}

/// Load the config file. An explicit `config_override` must exist; the
/// default location is optional and falls back to [`Config::default`].
pub fn load_config(config_override: Option<&Path>) -> Result<Config> {
    let config_file = match config_override {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => match config_file() {
            Some(path) if path.exists() => path,
            _ => {
                log::debug!("no config file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let contents = fs::read_to_string(&config_file)
        .with_context(|| format!("failed to read {}", config_file.display()))?;
    load_config_from_str(&contents)
        .with_context(|| format!("invalid config file {}", config_file.display()))
}
