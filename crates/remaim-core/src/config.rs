//! Configuration management for remaim.
//!
//! Handles loading configuration from a TOML file. The default location is
//! platform specific:
//!
//! - **macOS/Linux**: `~/.config/remaim/config.toml`
//! - **Windows**: `%APPDATA%\remaim\config.toml`
//!
//! # Example
//!
//! ```toml
//! [redmine]
//! url = "https://redmine.example.com"
//! api_key = "0123456789abcdef"
//!
//! [phabricator]
//! url = "https://phabricator.example.com"
//! token = "api-xxxxxxxxxxxx"
//!
//! [priority_map]
//! Immediate = "unbreak"
//! High = "high"
//! Normal = 50
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "remaim";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source tracker
    #[serde(default)]
    pub redmine: RedmineConfig,

    /// Destination tracker
    #[serde(default)]
    pub phabricator: PhabricatorConfig,

    /// Redmine priority name -> Phabricator priority
    #[serde(default)]
    pub priority_map: BTreeMap<String, PriorityValue>,
}

/// Redmine connection settings.
///
/// Either `api_key` or `user` + `password` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedmineConfig {
    /// Redmine instance URL
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Phabricator connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhabricatorConfig {
    /// Phabricator instance URL
    pub url: String,
    /// Conduit API token
    pub token: String,
}

/// A priority as written in the config: a keyword or a numeric weight.
///
/// Phabricator only accepts the string form, so both render as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriorityValue {
    Keyword(String),
    Weight(i64),
}

impl fmt::Display for PriorityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityValue::Keyword(k) => f.write_str(k),
            PriorityValue::Weight(w) => write!(f, "{}", w),
        }
    }
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Unlike a missing optional setting, a missing file is an error: both
    /// trackers need credentials.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Check that both trackers are configured.
    pub fn validate(&self) -> Result<()> {
        if self.redmine.url.trim().is_empty() {
            return Err(Error::Config("redmine.url is required".to_string()));
        }
        let has_key = self.redmine.api_key.as_deref().is_some_and(|k| !k.is_empty());
        let has_login = self.redmine.user.is_some() && self.redmine.password.is_some();
        if !has_key && !has_login {
            return Err(Error::Config(
                "Either redmine.api_key or redmine.user and redmine.password are required"
                    .to_string(),
            ));
        }
        if self.phabricator.url.trim().is_empty() {
            return Err(Error::Config("phabricator.url is required".to_string()));
        }
        if self.phabricator.token.trim().is_empty() {
            return Err(Error::Config("phabricator.token is required".to_string()));
        }
        Ok(())
    }

    /// Priority map with every value rendered as text.
    pub fn priority_map(&self) -> BTreeMap<String, String> {
        self.priority_map
            .iter()
            .map(|(label, value)| (label.clone(), value.to_string()))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
