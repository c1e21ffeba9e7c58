//! Final stage: completion summary and unmounting the target.

use crate::command_runner::{FailPolicy, Progress};
use crate::error::Result;
use crate::reporter::NoticeLevel;
use crate::scripts::disk::UnmountArgs;
use crate::session::Session;
use crate::types::Username;
use std::path::Path;

/// Show the operator what to do after reboot.
pub fn show_summary(session: &mut Session, username: &Username, first_login_script: &str) -> Result<()> {
    let lines = [
        "The base system is installed.".to_string(),
        String::new(),
        "Next steps:".to_string(),
        "1. Reboot the computer".to_string(),
        format!("2. Log in as {}", username),
        format!("3. {} runs once on first login", first_login_script),
        String::new(),
        format!("Log file: {}", session.log().path().display()),
    ];
    session
        .reporter()
        .show_panel("INSTALLATION COMPLETE", &lines, Some("Press Enter to finish..."));
    session.reporter().pause("")
}

/// Recursively unmount the target. A failure is logged but not fatal.
pub fn unmount_target(session: &mut Session, target: &Path) -> Result<bool> {
    let args = UnmountArgs {
        target: target.to_path_buf(),
    };
    let unmounted = session
        .execute_args(&args, FailPolicy::Continue, Progress::Stream)?
        .is_some();
    if unmounted {
        session
            .reporter()
            .notice(NoticeLevel::Success, "Installation complete! Reboot the system.");
    }
    session.log().append("Installation completed successfully");
    Ok(unmounted)
}
