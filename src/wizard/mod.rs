//! The interactive upload wizard
//!
//! A state machine over a closed set of steps. Each handler runs its
//! prompts and returns the next step; errors bubble to the run loop,
//! which converts them into the error screen. Cancelling a prompt
//! (Esc) returns to the main menu, Ctrl-C leaves the wizard entirely.

mod input;
mod menu;
mod progress;

use self::input::BrowseDecision;
use self::menu::{FileInputChoice, MainMenuChoice};
use crate::auth::CredentialStore;
use crate::error::{Error, Result, ValidationError};
use crate::logger::ActivityLog;
use crate::types::{Config, Privacy, UploadJob, VideoMetadata};
use crate::youtube::YouTubeClient;
use inquire::{Confirm, Select, Text};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::error;

/// Every screen the wizard can be on
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    MainMenu,
    FileInputMethod,
    SelectFiles,
    EnterFilePath,
    EnterTitle,
    EnterDescription,
    EnterTags,
    SelectPrivacy,
    ConfirmUpload,
    Uploading,
    Login,
    Authenticating,
    Help,
    Success(String),
    Error(String),
    Exit,
}

/// Metadata collected so far for the pending upload
#[derive(Debug, Default)]
struct Draft {
    file_path: Option<PathBuf>,
    title: String,
    description: String,
    tags: Vec<String>,
    privacy: Option<Privacy>,
}

/// The wizard itself
pub struct Wizard {
    config: Config,
    log: ActivityLog,
    store: CredentialStore,
    draft: Draft,
}

impl Wizard {
    pub fn new(config: Config, log: ActivityLog) -> Result<Self> {
        let store = CredentialStore::new(log.clone())?;

        Ok(Self {
            config,
            log,
            store,
            draft: Draft::default(),
        })
    }

    /// Run the wizard until the user exits
    pub async fn run(&mut self) -> Result<()> {
        let mut step = Step::MainMenu;

        loop {
            if step == Step::Exit {
                break;
            }

            step = match self.dispatch(step).await {
                Ok(next) => next,
                Err(Error::Interrupted) => return Err(Error::Interrupted),
                Err(Error::Cancelled) => {
                    self.draft = Draft::default();
                    Step::MainMenu
                }
                Err(e) => {
                    error!("Wizard step failed: {}", e);
                    self.log.record_error("Wizard step failed", &e);
                    Step::Error(e.to_string())
                }
            };
        }

        Ok(())
    }

    async fn dispatch(&mut self, step: Step) -> Result<Step> {
        match step {
            Step::MainMenu => self.main_menu(),
            Step::FileInputMethod => self.file_input_method(),
            Step::SelectFiles => self.select_files(),
            Step::EnterFilePath => self.enter_file_path(),
            Step::EnterTitle => self.enter_title(),
            Step::EnterDescription => self.enter_description(),
            Step::EnterTags => self.enter_tags(),
            Step::SelectPrivacy => self.select_privacy(),
            Step::ConfirmUpload => self.confirm_upload(),
            Step::Uploading => self.uploading().await,
            Step::Login => self.login(),
            Step::Authenticating => self.authenticating().await,
            Step::Help => self.help(),
            Step::Success(video_id) => self.success(video_id),
            Step::Error(message) => self.show_error(message),
            Step::Exit => Ok(Step::Exit),
        }
    }

    fn main_menu(&mut self) -> Result<Step> {
        println!();
        let choice = Select::new("What would you like to do?", MainMenuChoice::all()).prompt()?;

        Ok(match choice {
            MainMenuChoice::UploadVideo => Step::FileInputMethod,
            MainMenuChoice::Login => Step::Login,
            MainMenuChoice::Help => Step::Help,
            MainMenuChoice::Exit => Step::Exit,
        })
    }

    fn file_input_method(&mut self) -> Result<Step> {
        let choice = Select::new("How do you want to pick the file?", FileInputChoice::all())
            .prompt()?;

        Ok(match choice {
            FileInputChoice::BrowseCurrentDir => Step::SelectFiles,
            FileInputChoice::EnterPath => Step::EnterFilePath,
        })
    }

    fn select_files(&mut self) -> Result<Step> {
        let dir = std::env::current_dir()?;
        let files = input::list_video_files(&dir)?;

        match input::decide_browse(files) {
            BrowseDecision::Empty => {
                println!("No video files found in {}", dir.display());
                println!("Looking for: .mp4, .mov, .avi, .wmv");

                // Submit re-scans; Esc and Ctrl-C are the only ways out
                Text::new("Press Enter to scan again").prompt()?;
                Ok(Step::SelectFiles)
            }
            BrowseDecision::AutoSelect(file) => {
                println!("✓ Found one video: {}", file);
                self.draft.file_path = Some(file.path);
                Ok(Step::EnterTitle)
            }
            BrowseDecision::Choose(files) => {
                let file = Select::new("Select a video to upload:", files).prompt()?;
                self.draft.file_path = Some(file.path);
                Ok(Step::EnterTitle)
            }
        }
    }

    fn enter_file_path(&mut self) -> Result<Step> {
        let raw = Text::new("Path to the video file:").prompt()?;

        match input::validate_manual_path(&raw) {
            Ok(path) => {
                self.draft.file_path = Some(path);
                Ok(Step::EnterTitle)
            }
            Err(e) => {
                self.log.validation_failure(&e.to_string());
                Ok(Step::Error(Error::from(e).to_string()))
            }
        }
    }

    fn enter_title(&mut self) -> Result<Step> {
        let title = Text::new("Title:")
            .with_initial_value(&self.draft.title)
            .prompt()?;

        // Empty stays allowed here; the confirm step is the gate
        self.draft.title = title.trim().to_string();
        Ok(Step::EnterDescription)
    }

    fn enter_description(&mut self) -> Result<Step> {
        let description = Text::new("Description:")
            .with_initial_value(&self.draft.description)
            .prompt()?;

        self.draft.description = description;
        Ok(Step::EnterTags)
    }

    fn enter_tags(&mut self) -> Result<Step> {
        let raw = Text::new("Tags (comma separated):").prompt()?;

        self.draft.tags = input::parse_tags(&raw);
        Ok(Step::SelectPrivacy)
    }

    fn select_privacy(&mut self) -> Result<Step> {
        let options = Privacy::all();
        let default_idx = options
            .iter()
            .position(|p| *p == self.config.default_privacy)
            .unwrap_or(0);

        let privacy = Select::new("Privacy:", options)
            .with_starting_cursor(default_idx)
            .prompt()?;

        self.draft.privacy = Some(privacy);
        Ok(Step::ConfirmUpload)
    }

    fn confirm_upload(&mut self) -> Result<Step> {
        let path = match check_final_gate(&self.draft.title, self.draft.file_path.as_deref()) {
            Ok(path) => path,
            Err(e) => {
                self.log.validation_failure(&e.to_string());
                return Ok(Step::Error(Error::from(e).to_string()));
            }
        };

        let privacy = self.draft.privacy.unwrap_or(self.config.default_privacy);

        println!();
        println!("Upload summary");
        println!("==============");
        println!("File:    {}", path.display());
        println!("Title:   {}", self.draft.title);
        if !self.draft.description.is_empty() {
            println!("About:   {}", self.draft.description);
        }
        if !self.draft.tags.is_empty() {
            println!("Tags:    {}", self.draft.tags.join(", "));
        }
        println!("Privacy: {}", privacy);
        println!();

        let confirmed = Confirm::new("Start the upload?").with_default(true).prompt()?;
        if confirmed {
            Ok(Step::Uploading)
        } else {
            self.draft = Draft::default();
            Ok(Step::MainMenu)
        }
    }

    async fn uploading(&mut self) -> Result<Step> {
        let path = match check_final_gate(&self.draft.title, self.draft.file_path.as_deref()) {
            Ok(path) => path,
            Err(e) => {
                self.log.validation_failure(&e.to_string());
                return Ok(Step::Error(Error::from(e).to_string()));
            }
        };

        let metadata = VideoMetadata {
            title: self.draft.title.clone(),
            description: self.draft.description.clone(),
            tags: self.draft.tags.clone(),
            privacy: self.draft.privacy.unwrap_or(self.config.default_privacy),
            category_id: self.config.category_id.clone(),
        };
        let job = UploadJob {
            file_path: path,
            metadata,
        };

        // The store records the attempt, whether cached or interactive
        let creds = match self.store.authorize().await {
            Ok(creds) => creds,
            Err(e) => return Ok(Step::Error(e.to_string())),
        };

        println!();
        println!("Uploading {}...", job.file_path.display());

        let on_progress = |fraction: f64| {
            print!("\r{}", progress::render_progress(fraction));
            let _ = std::io::stdout().flush();
        };

        let mut client = YouTubeClient::new(self.store.clone(), creds, self.log.clone());
        match client.upload(&job, on_progress).await {
            Ok(video_id) => {
                println!();
                Ok(Step::Success(video_id))
            }
            Err(e) => {
                println!();
                Ok(Step::Error(e.to_string()))
            }
        }
    }

    fn login(&mut self) -> Result<Step> {
        println!();
        println!("YouTube Login");
        println!("=============");
        println!("A browser window will open for you to grant upload access.");

        Ok(Step::Authenticating)
    }

    async fn authenticating(&mut self) -> Result<Step> {
        match self.store.authorize().await {
            Ok(_) => {
                println!("✓ You are logged in");
                Ok(Step::MainMenu)
            }
            Err(e) => Ok(Step::Error(e.to_string())),
        }
    }

    fn help(&mut self) -> Result<Step> {
        println!();
        println!("How it works");
        println!("============");
        println!("1. Put your Google OAuth client file (client_secrets.json) in this directory");
        println!("2. Login opens a browser where you grant upload access");
        println!("3. Upload walks through file, title, description, tags and privacy");
        println!();
        println!("Tokens are cached in ~/.ytup/tokens.json");
        println!("Activity is recorded under logs/");

        let recent = self.log.tail(5).unwrap_or_default();
        if !recent.is_empty() {
            println!();
            println!("Recent activity");
            println!("===============");
            for line in recent {
                println!("{}", line);
            }
        }

        Text::new("Press Enter to return to the menu").prompt()?;
        Ok(Step::MainMenu)
    }

    fn success(&mut self, video_id: String) -> Result<Step> {
        println!();
        println!("✓ Upload complete!");
        println!("Watch it here: {}", progress::watch_url(&video_id));
        println!();

        self.draft = Draft::default();
        Text::new("Press Enter to return to the menu").prompt()?;
        Ok(Step::MainMenu)
    }

    fn show_error(&mut self, message: String) -> Result<Step> {
        println!();
        println!("Error: {}", message);
        println!();

        self.draft = Draft::default();
        Text::new("Press Enter to return to the menu").prompt()?;
        Ok(Step::MainMenu)
    }
}

/// The last check before an upload is allowed to start
fn check_final_gate(
    title: &str,
    file_path: Option<&Path>,
) -> std::result::Result<PathBuf, ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }

    let path = file_path.ok_or(ValidationError::EmptyPath)?;
    let metadata = std::fs::metadata(path)
        .map_err(|_| ValidationError::PathDoesNotExist(path.to_path_buf()))?;
    if !metadata.is_file() {
        return Err(ValidationError::NotRegularFile(path.to_path_buf()));
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_gate_requires_title() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("v.mp4");
        std::fs::write(&file, b"x").unwrap();

        let err = check_final_gate("  ", Some(&file)).unwrap_err();
        assert!(matches!(err, ValidationError::MissingTitle));
    }

    #[test]
    fn test_gate_rejects_vanished_file() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone.mp4");

        let err = check_final_gate("Title", Some(&gone)).unwrap_err();
        assert!(matches!(err, ValidationError::PathDoesNotExist(_)));
    }

    #[test]
    fn test_gate_rejects_directory() {
        let dir = TempDir::new().unwrap();

        let err = check_final_gate("Title", Some(dir.path())).unwrap_err();
        assert!(matches!(err, ValidationError::NotRegularFile(_)));
    }

    #[test]
    fn test_gate_requires_a_file_path() {
        let err = check_final_gate("Title", None).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyPath));
    }

    #[test]
    fn test_gate_passes_a_valid_draft() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("v.mp4");
        std::fs::write(&file, b"x").unwrap();

        let path = check_final_gate("Title", Some(&file)).unwrap();
        assert_eq!(path, file);
    }

    #[test]
    fn test_gate_failures_render_with_their_kind() {
        // The error screen shows the converted form, not the bare detail
        let message = Error::from(ValidationError::MissingTitle).to_string();
        assert_eq!(message, "Validation error: a title is required before uploading");
    }
}
