//! Append-only install log
//!
//! Every stage and every command invocation is recorded in
//! `{log_dir}/install.log`. The file is truncated once when the log is
//! initialized and only appended to afterwards. There is exactly one
//! `InstallLog` per run, owned by the `Session` and passed by reference.
//!
//! Opening the log is fatal on failure: the installer performs irreversible
//! disk operations and must leave an audit trail. Write failures after that
//! point are reported through `tracing` and do not stop the run.

use crate::error::{InstallerError, Result};
use chrono::Local;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the log inside the log directory.
pub const LOG_FILE_NAME: &str = "install.log";

/// Command output is cut to this many characters in the log.
pub const OUTPUT_LOG_LIMIT: usize = 500;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug)]
pub struct InstallLog {
    path: PathBuf,
    file: File,
}

impl InstallLog {
    /// Create the log directory, truncate the log file and write the header.
    pub fn initialize(log_dir: &Path) -> Result<Self> {
        let path = log_dir.join(LOG_FILE_NAME);
        let log_error = |source| InstallerError::Log {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(log_dir).map_err(log_error)?;
        let mut file = File::create(&path).map_err(log_error)?;

        let header = format!(
            "Quasar Linux Installer Log\n\
             Started at: {}\n\
             Installer version: {}\n\
             System: {}\n\
             {}\n",
            Local::now().format(TIMESTAMP_FORMAT),
            env!("CARGO_PKG_VERSION"),
            crate::hardware::host_facts(),
            "-".repeat(80),
        );
        file.write_all(header.as_bytes()).map_err(log_error)?;

        tracing::info!("Install log initialized at {}", path.display());
        Ok(Self { path, file })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped record.
    pub fn append(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::debug!(target: "install_log", "{}", message);

        let line = format!("[{}] {}\n", Local::now().format(TIMESTAMP_FORMAT), message);
        if let Err(e) = (&self.file).write_all(line.as_bytes()) {
            tracing::warn!("Failed to append to {}: {}", self.path.display(), e);
        }
    }

    /// Record a finished command with its (truncated) output and error text.
    pub fn command(&self, command: &str, output: &str, error: &str) {
        self.append(format!("COMMAND: {}", command));
        if !output.trim().is_empty() {
            self.append(format!("OUTPUT: {}", truncate_chars(output.trim(), OUTPUT_LOG_LIMIT)));
        }
        if !error.trim().is_empty() {
            self.append(format!("ERROR: {}", error.trim()));
        }
    }
}

/// Cut `text` to at most `limit` characters on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(log: &InstallLog) -> String {
        fs::read_to_string(log.path()).expect("log readable")
    }

    #[test]
    fn test_initialize_writes_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = InstallLog::initialize(dir.path()).expect("log opens");

        let content = read(&log);
        assert!(content.starts_with("Quasar Linux Installer Log\n"));
        assert!(content.contains("Started at: "));
        assert!(content.contains("System: "));
        assert_eq!(log.path(), dir.path().join(LOG_FILE_NAME));
    }

    #[test]
    fn test_initialize_truncates_previous_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(LOG_FILE_NAME), "stale line from last run\n").unwrap();

        let log = InstallLog::initialize(dir.path()).expect("log opens");
        assert!(!read(&log).contains("stale line"));
    }

    #[test]
    fn test_initialize_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a/b");
        let log = InstallLog::initialize(&nested).expect("log opens");
        assert!(log.path().exists());
    }

    #[test]
    fn test_unwritable_location_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let err = InstallLog::initialize(&blocker.join("logs")).unwrap_err();
        assert!(matches!(err, InstallerError::Log { .. }));
    }

    #[test]
    fn test_append_is_timestamped_and_ordered() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = InstallLog::initialize(dir.path()).expect("log opens");
        log.append("first");
        log.append("second");

        let content = read(&log);
        let first = content.find("] first").expect("first recorded");
        let second = content.find("] second").expect("second recorded");
        assert!(first < second);
        assert!(content.lines().any(|l| l.starts_with('[') && l.ends_with("] first")));
    }

    #[test]
    fn test_command_record_truncates_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = InstallLog::initialize(dir.path()).expect("log opens");
        let long = "x".repeat(2000);
        log.command("lsblk", &long, "");

        let content = read(&log);
        assert!(content.contains("COMMAND: lsblk"));
        let output_line = content
            .lines()
            .find(|l| l.contains("OUTPUT: "))
            .expect("output recorded");
        assert_eq!(output_line.matches('x').count(), OUTPUT_LOG_LIMIT);
        assert!(!content.contains("ERROR:"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
