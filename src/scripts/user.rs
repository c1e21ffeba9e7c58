//! Typed arguments for account tools run inside the target root.
//!
//! Passwords never appear on a command line: `ChpasswdArgs` hands
//! `name:password` to `chpasswd` on stdin and its `Debug` output is redacted.

use super::quote_path;
use crate::command_args::CommandArgs;
use crate::types::{shell_quote, Username};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

fn chroot_prefix(tool: &str, target: &std::path::Path) -> String {
    format!("{} {}", shell_quote(tool), quote_path(target))
}

/// `useradd -m -G <group> -s <shell> <name>` inside the target.
#[derive(Debug, Clone)]
pub struct UserAddArgs {
    pub chroot_tool: String,
    pub target: PathBuf,
    pub username: Username,
    /// Primary supplementary group (`wheel`).
    pub group: String,
    pub shell: String,
}

impl CommandArgs for UserAddArgs {
    fn to_command_line(&self) -> String {
        format!(
            "{} useradd -m -G {} -s {} {}",
            chroot_prefix(&self.chroot_tool, &self.target),
            shell_quote(&self.group),
            shell_quote(&self.shell),
            self.username
        )
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// `usermod -aG <g1,g2,...> <name>` inside the target.
#[derive(Debug, Clone)]
pub struct UserModGroupsArgs {
    pub chroot_tool: String,
    pub target: PathBuf,
    pub username: Username,
    pub groups: Vec<String>,
}

impl CommandArgs for UserModGroupsArgs {
    fn to_command_line(&self) -> String {
        format!(
            "{} usermod -aG {} {}",
            chroot_prefix(&self.chroot_tool, &self.target),
            shell_quote(&self.groups.join(",")),
            self.username
        )
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// `chpasswd` inside the target with the credentials on stdin.
#[derive(Clone)]
pub struct ChpasswdArgs {
    pub chroot_tool: String,
    pub target: PathBuf,
    /// Account name (`root` or a validated username).
    pub account: String,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for ChpasswdArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChpasswdArgs")
            .field("chroot_tool", &self.chroot_tool)
            .field("target", &self.target)
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl CommandArgs for ChpasswdArgs {
    fn to_command_line(&self) -> String {
        format!("{} chpasswd", chroot_prefix(&self.chroot_tool, &self.target))
    }

    fn is_destructive(&self) -> bool {
        true
    }

    fn secret_stdin(&self) -> Option<Zeroizing<String>> {
        Some(Zeroizing::new(format!("{}:{}\n", self.account, self.password.as_str())))
    }
}

/// `chown <name>:<name> <path>` inside the target, where the account exists.
#[derive(Debug, Clone)]
pub struct ChownArgs {
    pub chroot_tool: String,
    pub target: PathBuf,
    pub owner: Username,
    /// Path as seen from inside the target.
    pub path: PathBuf,
}

impl CommandArgs for ChownArgs {
    fn to_command_line(&self) -> String {
        format!(
            "{0} chown {2}:{2} {1}",
            chroot_prefix(&self.chroot_tool, &self.target),
            quote_path(&self.path),
            self.owner
        )
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Username {
        "alice".parse().expect("valid username")
    }

    #[test]
    fn test_useradd_line() {
        let args = UserAddArgs {
            chroot_tool: "artix-chroot".into(),
            target: PathBuf::from("/mnt"),
            username: alice(),
            group: "wheel".into(),
            shell: "/bin/bash".into(),
        };
        assert_eq!(
            args.to_command_line(),
            "artix-chroot /mnt useradd -m -G wheel -s /bin/bash alice"
        );
    }

    #[test]
    fn test_usermod_joins_groups() {
        let args = UserModGroupsArgs {
            chroot_tool: "artix-chroot".into(),
            target: PathBuf::from("/mnt"),
            username: alice(),
            groups: vec!["audio".into(), "video".into(), "input".into()],
        };
        assert_eq!(
            args.to_command_line(),
            "artix-chroot /mnt usermod -aG audio,video,input alice"
        );
    }

    #[test]
    fn test_chpasswd_keeps_password_off_the_command_line() {
        let args = ChpasswdArgs {
            chroot_tool: "artix-chroot".into(),
            target: PathBuf::from("/mnt"),
            account: "root".into(),
            password: Zeroizing::new("it's s3cret".into()),
        };
        let line = args.to_command_line();
        assert_eq!(line, "artix-chroot /mnt chpasswd");
        assert!(!line.contains("s3cret"));

        let stdin = args.secret_stdin().expect("stdin carries credentials");
        assert_eq!(stdin.as_str(), "root:it's s3cret\n");

        let debug = format!("{:?}", args);
        assert!(!debug.contains("s3cret"));

        let invocation = args.to_invocation();
        assert!(invocation.is_destructive());
        assert_eq!(invocation.secret_stdin(), Some("root:it's s3cret\n"));
    }

    #[test]
    fn test_chown_runs_inside_target() {
        let args = ChownArgs {
            chroot_tool: "artix-chroot".into(),
            target: PathBuf::from("/mnt"),
            owner: alice(),
            path: PathBuf::from("/home/alice/INST.sh"),
        };
        assert_eq!(
            args.to_command_line(),
            "artix-chroot /mnt chown alice:alice /home/alice/INST.sh"
        );
    }
}
