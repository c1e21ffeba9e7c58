//! Account provisioning inside the target root.
//!
//! Passwords are read twice through the reporter's secret prompt, held in
//! `Zeroizing` buffers and handed to `chpasswd` on stdin. The install log
//! only ever records `Password set for <name>`.

use crate::command_runner::{FailPolicy, Progress};
use crate::config::InstallerConfig;
use crate::error::Result;
use crate::reporter::NoticeLevel;
use crate::scripts::user::{ChpasswdArgs, UserAddArgs, UserModGroupsArgs};
use crate::session::Session;
use crate::types::Username;
use std::path::Path;

/// Whose password is being set.
#[derive(Debug, Clone, Copy)]
pub enum Account<'a> {
    User(&'a Username),
    Root,
}

impl Account<'_> {
    pub fn name(&self) -> &str {
        match self {
            Self::User(name) => name.as_str(),
            Self::Root => "root",
        }
    }

    fn title(&self) -> String {
        match self {
            Self::User(name) => format!("SET PASSWORD FOR {}", name),
            Self::Root => "SET PASSWORD FOR ROOT".to_string(),
        }
    }
}

/// Ask for the new user's name until it is a valid username.
pub fn prompt_username(session: &mut Session) -> Result<Username> {
    loop {
        let input = session.reporter().prompt("New user name")?;
        match input.parse::<Username>() {
            Ok(name) => {
                session.log().append(format!("Creating user: {}", name));
                return Ok(name);
            }
            Err(e) => {
                session.log().append(format!("Rejected username: {}", e));
                session.reporter().notice(NoticeLevel::Error, &e.to_string());
            }
        }
    }
}

/// `useradd` (fatal) followed by supplementary groups (recoverable).
pub fn create_user(
    session: &mut Session,
    config: &InstallerConfig,
    target: &Path,
    username: &Username,
) -> Result<()> {
    session
        .reporter()
        .notice(NoticeLevel::Info, &format!("Creating user {}...", username));

    let add = UserAddArgs {
        chroot_tool: config.chroot_tool.clone(),
        target: target.to_path_buf(),
        username: username.clone(),
        group: config.wheel_group.clone(),
        shell: config.user_shell.clone(),
    };
    session.execute_args(&add, FailPolicy::FailFast, Progress::Stream)?;

    if !config.supplementary_groups.is_empty() {
        let groups = UserModGroupsArgs {
            chroot_tool: config.chroot_tool.clone(),
            target: target.to_path_buf(),
            username: username.clone(),
            groups: config.supplementary_groups.clone(),
        };
        session.execute_args(&groups, FailPolicy::Continue, Progress::Quiet)?;
    }
    Ok(())
}

/// Prompt for a password twice and set it once both entries match.
pub fn set_password(
    session: &mut Session,
    chroot_tool: &str,
    target: &Path,
    account: Account<'_>,
) -> Result<()> {
    loop {
        session.reporter().show_panel(
            &account.title(),
            &[
                "Enter the password".to_string(),
                "(input is not echoed)".to_string(),
            ],
            None,
        );
        let first = session.reporter().prompt_secret("Password")?;
        let second = session.reporter().prompt_secret("Repeat password")?;

        if first.is_empty() {
            session
                .reporter()
                .notice(NoticeLevel::Error, "The password cannot be empty. Try again.");
            continue;
        }
        if first != second {
            session.log().append(format!(
                "Password confirmation mismatch for {}",
                account.name()
            ));
            session
                .reporter()
                .notice(NoticeLevel::Error, "Passwords do not match! Try again.");
            continue;
        }

        let args = ChpasswdArgs {
            chroot_tool: chroot_tool.to_string(),
            target: target.to_path_buf(),
            account: account.name().to_string(),
            password: first,
        };
        session.execute_args(&args, FailPolicy::FailFast, Progress::Quiet)?;
        session
            .log()
            .append(format!("Password set for {}", account.name()));
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_names() {
        let alice: Username = "alice".parse().unwrap();
        assert_eq!(Account::User(&alice).name(), "alice");
        assert_eq!(Account::Root.name(), "root");
        assert_eq!(Account::Root.title(), "SET PASSWORD FOR ROOT");
    }
}
