//! Typed menu payloads
//!
//! Every selection prompt works over one of these types, so handlers
//! match on a known shape instead of display strings.

use std::fmt;
use std::path::PathBuf;

/// Top-level menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainMenuChoice {
    UploadVideo,
    Login,
    Help,
    Exit,
}

impl MainMenuChoice {
    pub fn all() -> Vec<MainMenuChoice> {
        vec![Self::UploadVideo, Self::Login, Self::Help, Self::Exit]
    }
}

impl fmt::Display for MainMenuChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UploadVideo => write!(f, "Upload a video"),
            Self::Login => write!(f, "Login to YouTube"),
            Self::Help => write!(f, "Help"),
            Self::Exit => write!(f, "Exit"),
        }
    }
}

/// How the user wants to pick the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileInputChoice {
    BrowseCurrentDir,
    EnterPath,
}

impl FileInputChoice {
    pub fn all() -> Vec<FileInputChoice> {
        vec![Self::BrowseCurrentDir, Self::EnterPath]
    }
}

impl fmt::Display for FileInputChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrowseCurrentDir => write!(f, "Browse this directory"),
            Self::EnterPath => write!(f, "Type a file path"),
        }
    }
}

/// An entry in the browse listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub name: String,
}

impl VideoFile {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self { path, name }
    }
}

impl fmt::Display for VideoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
