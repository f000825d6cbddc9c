//! Path utilities

use crate::error::Result;
use std::path::PathBuf;

/// Get the directory holding cached OAuth tokens (`~/.ytup`)
pub fn get_token_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| crate::error::Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.join(".ytup"))
}

/// Get the token cache file (`~/.ytup/tokens.json`)
pub fn get_token_cache_path() -> Result<PathBuf> {
    Ok(get_token_dir()?.join("tokens.json"))
}

/// Get the OAuth client secrets file, expected in the working directory
pub fn get_client_secrets_path() -> PathBuf {
    PathBuf::from("client_secrets.json")
}

/// Get config directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| crate::error::Error::Config("Could not determine config directory".to_string()))?;

    Ok(config_dir.join("ytup"))
}

/// Get the activity log directory, relative to the working directory
pub fn get_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
