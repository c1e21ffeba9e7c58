//! Error handling module for the installer
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every fatal condition in the pipeline surfaces as an `InstallerError`, and
//! `exit_code()` decides the process exit status.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the installer
#[derive(Error, Debug)]
pub enum InstallerError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The install log could not be opened. Fatal: no audit trail, no install.
    #[error("Cannot open install log {path:?}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Validation errors (operator input, value types)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A fail-fast command returned a non-zero status
    #[error("Command `{command}` failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        /// Exit status, or -1 when the process was killed by a signal or never spawned
        code: i32,
        stderr: String,
    },

    /// The second-stage chroot script aborted
    #[error("Chroot configuration failed (exit code {code}): {reason}")]
    ChrootScript { code: i32, reason: String },

    /// The installer was started without root privileges
    #[error("Root privileges required")]
    NotRoot,

    /// Operator input stream ended (EOF on stdin)
    #[error("Operator input closed")]
    InputClosed,

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// A context field was assigned twice
    #[error("Context error: {0}")]
    Context(String),

    /// Install state machine transition errors
    #[error("Install transition error: {0}")]
    InstallTransition(String),
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallerError>;

// Convenient error constructors
impl InstallerError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Create a context error
    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context(msg.into())
    }

    /// Process exit status for this error.
    ///
    /// Command failures exit with the failing command's own status when it
    /// fits in a process exit code; everything else exits with 1.
    pub fn exit_code(&self) -> u8 {
        let code = match self {
            Self::CommandFailed { code, .. } | Self::ChrootScript { code, .. } => *code,
            _ => 1,
        };
        u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InstallerError::validation("username too long");
        assert_eq!(err.to_string(), "Validation error: username too long");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: InstallerError = io_err.into();
        assert!(matches!(err, InstallerError::Io(_)));
    }

    #[test]
    fn test_command_failure_exit_code_matches_command() {
        let err = InstallerError::CommandFailed {
            command: "mkfs.ext4 -F /dev/sda2".to_string(),
            code: 5,
            stderr: "device busy".to_string(),
        };
        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().contains("mkfs.ext4 -F /dev/sda2"));
        assert!(err.to_string().contains("device busy"));
    }

    #[test]
    fn test_out_of_range_codes_fall_back_to_one() {
        let signal = InstallerError::CommandFailed {
            command: "basestrap".to_string(),
            code: -1,
            stderr: String::new(),
        };
        assert_eq!(signal.exit_code(), 1);

        let huge = InstallerError::ChrootScript {
            code: 300,
            reason: String::new(),
        };
        assert_eq!(huge.exit_code(), 1);

        assert_eq!(InstallerError::NotRoot.exit_code(), 1);
        assert_eq!(InstallerError::InputClosed.exit_code(), 1);
    }

    #[test]
    fn test_chroot_failure_keeps_script_code() {
        let err = InstallerError::ChrootScript {
            code: 3,
            reason: "EFI loader missing".to_string(),
        };
        assert_eq!(err.exit_code(), 3);
    }
}
