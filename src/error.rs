//! Error types for ytup

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Interrupted")]
    Interrupted,
}

/// Failures of the credential store and the OAuth consent flow.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("credentials file not found: {0}")]
    CredentialsFileNotFound(PathBuf),

    #[error("unreadable token cache: {0}")]
    UnreadableCache(String),

    #[error("consent flow failed: {0}")]
    Consent(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("token endpoint returned no access token")]
    MissingToken,
}

/// Failures of wizard input validation.
#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("please enter a file path")]
    EmptyPath,

    #[error("file does not exist: {0}")]
    PathDoesNotExist(PathBuf),

    #[error("not a regular file: {0}")]
    NotRegularFile(PathBuf),

    #[error("a title is required before uploading")]
    MissingTitle,
}

/// Failures of a single upload attempt.
#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("path is a directory: {0}")]
    PathIsDirectory(PathBuf),

    #[error("not a regular file: {0}")]
    PathNotRegularFile(PathBuf),

    #[error("upload session response did not include a session URL")]
    MissingSessionUrl,

    #[error("API error {code}: {message}")]
    Api {
        code: u16,
        status: Option<String>,
        message: String,
        reasons: Vec<String>,
    },

    #[error("upload response did not contain a video id")]
    NoVideoIdReturned,
}

impl From<inquire::InquireError> for Error {
    fn from(err: inquire::InquireError) -> Self {
        match err {
            inquire::InquireError::OperationCanceled => Error::Cancelled,
            inquire::InquireError::OperationInterrupted => Error::Interrupted,
            other => Error::Prompt(other.to_string()),
        }
    }
}
