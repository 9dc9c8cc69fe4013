//! Weft Configuration Module
//!
//! Persistent configuration for API keys and model defaults, stored in
//! `~/.config/weft/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`OPENAI_API_KEY`, `WEFT_MODEL`), including a
//!    local `.env` file
//! 2. Config file (`~/.config/weft/config.toml`)
//! 3. Defaults

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeftError};

/// Model used when neither the request nor the config names one
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeftConfig {
    /// API keys for language-model providers
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Default provider and model settings
    #[serde(default)]
    pub defaults: Defaults,
}

/// API keys configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiKeys {
    /// OpenAI API key (sk-proj-... or sk-...)
    pub openai: Option<String>,
}

/// Default settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Defaults {
    /// Default provider
    pub provider: Option<String>,

    /// Default model (gpt-4o, gpt-4o-mini, ...)
    pub model: Option<String>,
}

impl WeftConfig {
    /// Returns `~/.config/weft/` on Unix, `%APPDATA%/weft/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weft")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file.
    ///
    /// Returns default config if the file doesn't exist; errors only when
    /// a file exists but is malformed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| WeftError::ConfigError {
            reason: format!("Failed to read config file: {e}"),
        })?;

        toml::from_str(&content).map_err(|e| WeftError::ConfigError {
            reason: format!("Failed to parse config file: {e}"),
        })
    }

    /// Save configuration to file, creating the directory if needed.
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir();
        let path = Self::config_path();

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| WeftError::ConfigError {
                reason: format!("Failed to create config directory: {e}"),
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| WeftError::ConfigError {
            reason: format!("Failed to serialize config: {e}"),
        })?;

        fs::write(&path, content).map_err(|e| WeftError::ConfigError {
            reason: format!("Failed to write config file: {e}"),
        })?;

        Ok(())
    }

    /// Merge with environment variables (highest priority).
    ///
    /// Also reads a `.env` file from the working directory when present.
    pub fn with_env(mut self) -> Self {
        let _ = dotenvy::dotenv();

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.api_keys.openai = Some(key);
            }
        }

        if let Ok(model) = std::env::var("WEFT_MODEL") {
            if !model.is_empty() {
                self.defaults.model = Some(model);
            }
        }

        self
    }

    /// Effective OpenAI API key (merge env first via `with_env()`)
    pub fn openai_key(&self) -> Option<&str> {
        self.api_keys.openai.as_deref()
    }

    /// Effective model name.
    pub fn model(&self) -> &str {
        self.defaults.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}
