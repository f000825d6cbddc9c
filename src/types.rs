//! Core types and enums for ytup

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Visibility of the uploaded video on YouTube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Private,
    Unlisted,
}

impl std::fmt::Display for Privacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
            Self::Unlisted => write!(f, "unlisted"),
        }
    }
}

impl Privacy {
    pub fn all() -> Vec<Privacy> {
        vec![Privacy::Public, Privacy::Private, Privacy::Unlisted]
    }
}

/// Severity of an activity log record.
///
/// Ordering follows severity, so a configured threshold can be
/// compared with `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,
    #[serde(default = "default_category_id")]
    pub category_id: String,
    #[serde(default = "default_privacy")]
    pub default_privacy: Privacy,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_retention_days() -> u32 {
    7
}

// YouTube category 22 is "People & Blogs"
fn default_category_id() -> String {
    "22".to_string()
}

fn default_privacy() -> Privacy {
    Privacy::Private
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_retention_days: default_log_retention_days(),
            category_id: default_category_id(),
            default_privacy: default_privacy(),
        }
    }
}

/// Metadata collected by the wizard for a single video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy: Privacy,
    pub category_id: String,
}

/// A video file paired with the metadata to publish it under.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub file_path: PathBuf,
    pub metadata: VideoMetadata,
}

/// OAuth tokens persisted between sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// OAuth client descriptor in Google's installed-app format.
///
/// Matches the `client_secrets.json` file downloaded from the Google
/// Cloud console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSecrets {
    pub installed: InstalledApp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledApp {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}
