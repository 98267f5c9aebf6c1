//! Configuration management for plugboard.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Provider used when a command doesn't name one.
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_provider() -> String {
    "openai".to_string()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
        }
    }
}

/// Policy for capabilities that mutate files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Copy a file aside before overwriting or deleting it.
    #[serde(default = "bool_true")]
    pub backup: bool,
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,
}

fn bool_true() -> bool {
    true
}

fn default_backup_suffix() -> String {
    ".bak".to_string()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            backup: true,
            backup_suffix: default_backup_suffix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,
    #[serde(default)]
    pub search_api_key: Option<String>,
    #[serde(default = "default_search_api_key_env")]
    pub search_api_key_env: String,
    /// Client-wide HTTP timeout; `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_search_endpoint() -> String {
    "https://api.search.brave.com/res/v1/web/search".to_string()
}

fn default_search_api_key_env() -> String {
    "BRAVE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_chars() -> usize {
    20_000
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            search_endpoint: default_search_endpoint(),
            search_api_key: None,
            search_api_key_env: default_search_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_chars: default_max_chars(),
        }
    }
}

impl WebConfig {
    /// Search API key from the config file, falling back to the environment.
    pub fn search_api_key(&self) -> Option<String> {
        if let Some(key) = &self.search_api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var(&self.search_api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    /// Capabilities to register; empty registers every built-in.
    #[serde(default)]
    pub enabled: Vec<String>,
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".plugboard").join("config.toml"))
    }

    /// Load the default config file (or defaults) and apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(provider) = std::env::var("PLUGBOARD_PROVIDER") {
            self.schema.provider = provider;
        }
        if let Ok(backup) = std::env::var("PLUGBOARD_BACKUP") {
            self.files.backup = !matches!(backup.to_lowercase().as_str(), "0" | "false" | "no" | "off");
        }
        if let Ok(key) = std::env::var("PLUGBOARD_SEARCH_API_KEY") {
            self.web.search_api_key = Some(key);
        }
        self
    }

    pub fn save_default() -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        Self::default().save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}
