//! Configuration management

use crate::error::Result;
use crate::types::Config;
use std::path::PathBuf;
use tokio::fs;

/// Configuration file name
const CONFIG_FILE: &str = "config.json";

/// Loads and persists the application configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager
    ///
    /// Loads the config file if present, otherwise writes a default one
    /// so it can be edited later.
    pub async fn new() -> Result<Self> {
        let config_dir = crate::paths::get_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE);

        Self::with_path(config_path).await
    }

    /// Create a config manager backed by a specific file
    pub async fn with_path(config_path: PathBuf) -> Result<Self> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let manager = if config_path.exists() {
            let config = Self::load_config(&config_path).await?;
            Self {
                config_path,
                config,
            }
        } else {
            let manager = Self {
                config_path,
                config: Config::default(),
            };
            manager.save().await?;
            manager
        };

        Ok(manager)
    }

    /// Get current config
    pub fn get(&self) -> &Config {
        &self.config
    }

    /// Save config
    pub async fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.config_path, json).await?;
        Ok(())
    }

    /// Load config from file
    async fn load_config(path: &PathBuf) -> Result<Config> {
        let content = fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;

        Ok(config)
    }
}
