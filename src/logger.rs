//! Activity logging
//!
//! Two channels: `tracing` carries developer diagnostics to stderr when
//! `RUST_LOG` is set, while [`ActivityLog`] records user-visible events
//! to daily files under `logs/`.

use crate::error::Result;
use crate::types::LogLevel;
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Activity log file name prefix
const LOG_PREFIX: &str = "ytup-";

/// Initialize tracing
///
/// Diagnostics go to stderr and stay silent unless `RUST_LOG` is set,
/// so they never mix with the interactive prompts.
pub fn init_tracing() {
    let env_filter = EnvFilter::from_default_env();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[derive(Debug)]
struct LogInner {
    dir: PathBuf,
    threshold: LogLevel,
    date: NaiveDate,
    writer: Option<BufWriter<File>>,
}

impl LogInner {
    fn current_path(&self) -> PathBuf {
        self.dir.join(file_name_for(self.date))
    }

    fn write_text(&mut self, text: &str) -> std::io::Result<()> {
        let today = Local::now().date_naive();
        if today != self.date {
            // Day changed since the last record; switch files
            self.flush();
            self.writer = None;
            self.date = today;
        }

        if self.writer.is_none() {
            fs::create_dir_all(&self.dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.current_path())?;
            self.writer = Some(BufWriter::new(file));
        }

        if let Some(writer) = &mut self.writer {
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
        }

        Ok(())
    }

    fn flush(&mut self) {
        if let Some(writer) = &mut self.writer {
            let _ = writer.flush();
        }
    }
}

impl Drop for LogInner {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Handle to the daily activity log
///
/// Cheap to clone; all clones append to the same file. Writes never
/// fail the caller: if the file cannot be written, the record goes to
/// stderr instead.
#[derive(Clone)]
pub struct ActivityLog {
    inner: Arc<Mutex<LogInner>>,
}

impl ActivityLog {
    /// Create a log writing to the default `logs/` directory
    pub fn new(threshold: LogLevel) -> Self {
        Self::with_dir(crate::paths::get_log_dir(), threshold)
    }

    /// Create a log writing to a specific directory
    pub fn with_dir(dir: PathBuf, threshold: LogLevel) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner {
                dir,
                threshold,
                date: Local::now().date_naive(),
                writer: None,
            })),
        }
    }

    /// Append a record at the given level
    ///
    /// Records below the configured threshold are dropped. Metadata is
    /// appended to the line as compact JSON.
    pub fn record(&self, level: LogLevel, message: &str, metadata: Option<Value>) {
        let mut text = format!(
            "[{}] [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            message
        );
        if let Some(meta) = metadata {
            text.push(' ');
            text.push_str(&meta.to_string());
        }
        text.push('\n');

        self.append(level, text);
    }

    /// Append an error record followed by its source chain
    pub fn record_error(&self, message: &str, err: &dyn std::error::Error) {
        let mut text = format!(
            "[{}] [{}] {}: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            LogLevel::Error,
            message,
            err
        );

        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str(&format!("    caused by: {}\n", cause));
            source = cause.source();
        }

        self.append(LogLevel::Error, text);
    }

    fn append(&self, level: LogLevel, text: String) {
        let mut inner = self.lock();

        if level < inner.threshold {
            return;
        }

        if let Err(e) = inner.write_text(&text) {
            // The log must never take the app down with it
            eprint!("{}", text);
            eprintln!("ytup: activity log write failed: {}", e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // --- domain records ---

    pub fn session_start(&self, version: &str) {
        self.record(
            LogLevel::Info,
            "Session started",
            Some(json!({ "version": version })),
        );
    }

    pub fn session_end(&self) {
        self.record(LogLevel::Info, "Session ended", None);
    }

    pub fn auth_start(&self) {
        self.record(LogLevel::Info, "Authentication started", None);
    }

    pub fn auth_success(&self) {
        self.record(LogLevel::Info, "Authentication succeeded", None);
    }

    pub fn auth_error(&self, err: &dyn std::error::Error) {
        self.record_error("Authentication failed", err);
    }

    pub fn upload_start(&self, file: &Path, title: &str, bytes: u64) {
        self.record(
            LogLevel::Info,
            "Upload started",
            Some(json!({
                "file": file.display().to_string(),
                "title": title,
                "bytes": bytes,
            })),
        );
    }

    /// Progress records are DEBUG so the default threshold keeps the
    /// daily file readable.
    pub fn upload_progress(&self, fraction: f64) {
        self.record(
            LogLevel::Debug,
            "Upload progress",
            Some(json!({ "percent": (fraction * 100.0).round() as u64 })),
        );
    }

    pub fn upload_success(&self, video_id: &str) {
        self.record(
            LogLevel::Info,
            "Upload succeeded",
            Some(json!({ "video_id": video_id })),
        );
    }

    pub fn upload_error(&self, err: &dyn std::error::Error) {
        self.record_error("Upload failed", err);
    }

    pub fn validation_failure(&self, detail: &str) {
        self.record(
            LogLevel::Warn,
            "Validation failed",
            Some(json!({ "detail": detail })),
        );
    }

    // --- utilities ---

    /// Last `n` lines of today's log file
    pub fn tail(&self, n: usize) -> Result<Vec<String>> {
        let mut inner = self.lock();
        inner.flush();

        let path = inner.current_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<_>>()?;

        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].to_vec())
    }

    /// Delete today's log file
    ///
    /// A later record re-creates it.
    pub fn delete_current(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.writer = None;

        let path = inner.current_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }

        Ok(())
    }

    /// Move log files older than `days` into `logs/archive/`
    ///
    /// Returns the number of files moved.
    pub fn archive_old(&self, days: u32) -> Result<usize> {
        let dir = self.lock().dir.clone();
        if !dir.exists() {
            return Ok(0);
        }

        let cutoff = Local::now().date_naive() - chrono::Duration::days(days as i64);
        let mut old_files = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let date = match parse_log_date(&name) {
                Some(date) => date,
                None => continue,
            };

            if date < cutoff {
                old_files.push((entry.path(), name));
            }
        }

        if old_files.is_empty() {
            return Ok(0);
        }

        let archive_dir = dir.join("archive");
        fs::create_dir_all(&archive_dir)?;
        for (path, name) in &old_files {
            fs::rename(path, archive_dir.join(name))?;
        }

        Ok(old_files.len())
    }
}

fn file_name_for(date: NaiveDate) -> String {
    format!("{}{}.log", LOG_PREFIX, date.format("%Y-%m-%d"))
}

/// Parse the date out of a file name like `ytup-2025-01-15.log`
fn parse_log_date(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_prefix(LOG_PREFIX)?.strip_suffix(".log")?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_log(dir: &TempDir, threshold: LogLevel) -> ActivityLog {
        ActivityLog::with_dir(dir.path().to_path_buf(), threshold)
    }

    #[test]
    fn test_record_formats_line() {
        let dir = TempDir::new().unwrap();
        let log = test_log(&dir, LogLevel::Debug);

        log.record(LogLevel::Info, "Upload started", Some(json!({ "bytes": 42 })));

        let lines = log.tail(10).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].contains("] [INFO] Upload started {\"bytes\":42}"));
    }

    #[test]
    fn test_threshold_drops_lower_levels() {
        let dir = TempDir::new().unwrap();
        let log = test_log(&dir, LogLevel::Warn);

        log.record(LogLevel::Info, "hidden", None);
        log.record(LogLevel::Debug, "also hidden", None);

        assert!(log.tail(10).unwrap().is_empty());
    }

    #[test]
    fn test_progress_records_are_debug_level() {
        let dir = TempDir::new().unwrap();
        let log = test_log(&dir, LogLevel::Info);

        log.upload_progress(0.47);
        assert!(log.tail(10).unwrap().is_empty());

        let verbose = test_log(&dir, LogLevel::Debug);
        verbose.upload_progress(0.47);

        let lines = verbose.tail(10).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[DEBUG] Upload progress {\"percent\":47}"));
    }

    #[test]
    fn test_error_chain_on_indented_lines() {
        let dir = TempDir::new().unwrap();
        let log = test_log(&dir, LogLevel::Info);

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk detached");
        let err = crate::error::Error::from(io_err);
        log.upload_error(&err);

        let lines = log.tail(10).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[ERROR] Upload failed: IO error: disk detached"));
        assert_eq!(lines[1], "    caused by: disk detached");
    }

    #[test]
    fn test_tail_returns_last_n_lines() {
        let dir = TempDir::new().unwrap();
        let log = test_log(&dir, LogLevel::Info);

        for i in 1..=5 {
            log.record(LogLevel::Info, &format!("record {}", i), None);
        }

        let lines = log.tail(2).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("record 4"));
        assert!(lines[1].contains("record 5"));
    }

    #[test]
    fn test_delete_current_then_write_recreates() {
        let dir = TempDir::new().unwrap();
        let log = test_log(&dir, LogLevel::Info);

        log.record(LogLevel::Info, "first", None);
        log.delete_current().unwrap();
        assert!(log.tail(10).unwrap().is_empty());

        log.record(LogLevel::Info, "second", None);
        let lines = log.tail(10).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("second"));
    }

    #[test]
    fn test_archive_old_moves_dated_files() {
        let dir = TempDir::new().unwrap();
        let log = test_log(&dir, LogLevel::Info);
        log.record(LogLevel::Info, "today", None);

        fs::write(dir.path().join("ytup-2020-01-01.log"), "old\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep\n").unwrap();

        let moved = log.archive_old(7).unwrap();

        assert_eq!(moved, 1);
        assert!(dir
            .path()
            .join("archive")
            .join("ytup-2020-01-01.log")
            .exists());
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(log.tail(10).unwrap().len(), 1);
    }

    #[test]
    fn test_file_name_carries_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(file_name_for(date), "ytup-2025-01-15.log");
        assert_eq!(parse_log_date("ytup-2025-01-15.log"), Some(date));
        assert_eq!(parse_log_date("other.log"), None);
    }
}
