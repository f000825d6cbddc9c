//! ytup - interactive YouTube uploader
//!
//! A terminal wizard that authenticates against the YouTube Data API
//! and uploads a single video with its metadata.

pub mod auth;
pub mod config;
pub mod error;
pub mod logger;
pub mod paths;
pub mod types;
pub mod wizard;
pub mod youtube;

pub use error::{Error, Result};
pub use types::*;
