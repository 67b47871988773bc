use std::path::{Path, PathBuf};

use redmine::RedmineClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SessionError;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot determine config directory")]
    NoConfigDir,
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to encode settings: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the Redmine server, e.g. "https://redmine.example.com".
    #[serde(default)]
    pub redmine_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Relay to route API calls through (CORS/TLS bridge), when needed.
    #[serde(default)]
    pub relay_url: Option<String>,
    /// Custom field carrying the billable flag, when the server has one.
    #[serde(default)]
    pub billable_field_id: Option<u32>,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    "auto".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redmine_url: String::new(),
            api_key: String::new(),
            relay_url: None,
            billable_field_id: None,
            theme: default_theme(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        Ok(dirs::config_dir()
            .ok_or(SettingsError::NoConfigDir)?
            .join("takt")
            .join("config.toml"))
    }

    /// Load settings from disk. Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&raw)?;
        Ok(settings)
    }

    /// Save settings to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// True once both the server URL and the API key are set.
    pub fn is_configured(&self) -> bool {
        !self.redmine_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Builds an API client from these settings, routed through the relay
    /// when one is configured.
    pub fn connection(&self) -> Result<RedmineClient, SessionError> {
        if !self.is_configured() {
            return Err(SessionError::Configuration(
                "set the Redmine URL and API key first",
            ));
        }
        let client = match self.relay_url.as_deref() {
            Some(relay) if !relay.trim().is_empty() => {
                RedmineClient::via_relay(relay, self.redmine_url.clone(), self.api_key.clone())
            }
            _ => RedmineClient::new(self.redmine_url.clone(), self.api_key.clone()),
        };
        Ok(client)
    }
}
