//! Pre-install steps run on the live system before disk selection.
//!
//! - Console font preparation (package install + `setfont`), skippable and
//!   never fatal
//! - Boot mode announcement

use crate::command_runner::{FailPolicy, Progress};
use crate::config::ConsoleFont;
use crate::error::Result;
use crate::scripts::system::{FontPackageArgs, SetFontArgs};
use crate::session::Session;
use crate::types::BootMode;
use std::fmt;

/// Outcome of console font preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleFontResult {
    Applied,
    /// No font configured.
    Skipped,
    /// A step failed (non-fatal, installation continues).
    Failed(String),
}

impl fmt::Display for ConsoleFontResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "Console font applied"),
            Self::Skipped => write!(f, "Console font not configured"),
            Self::Failed(step) => write!(f, "Console font setup failed at {}", step),
        }
    }
}

/// Install and load the configured console font.
pub fn prepare_console(session: &mut Session, font: Option<&ConsoleFont>) -> Result<ConsoleFontResult> {
    let Some(font) = font else {
        return Ok(ConsoleFontResult::Skipped);
    };

    let install = FontPackageArgs {
        package: font.package.clone(),
    };
    if session
        .execute_args(&install, FailPolicy::Continue, Progress::Stream)?
        .is_none()
    {
        return Ok(ConsoleFontResult::Failed(format!("package {}", font.package)));
    }

    let set = SetFontArgs {
        font: font.font.clone(),
    };
    if session
        .execute_args(&set, FailPolicy::Continue, Progress::Quiet)?
        .is_none()
    {
        return Ok(ConsoleFontResult::Failed(format!("setfont {}", font.font)));
    }

    Ok(ConsoleFontResult::Applied)
}

/// Record the detected boot mode and show it to the operator.
pub fn announce_boot_mode(session: &mut Session, boot_mode: BootMode) -> Result<()> {
    session
        .log()
        .append(format!("Boot mode detected: {}", boot_mode));
    session.reporter().show_panel(
        "BOOT MODE",
        &[format!("Detected boot mode: {}", boot_mode)],
        Some("Press Enter to continue..."),
    );
    session.reporter().pause("")
}
