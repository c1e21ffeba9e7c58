//! Typed arguments for base-system tools: bootstrap, fstab, file copies,
//! console font and chroot execution.

use super::quote_path;
use crate::command_args::CommandArgs;
use crate::types::shell_quote;
use std::path::PathBuf;

/// Install the package set into the target root in one step.
#[derive(Debug, Clone)]
pub struct BootstrapArgs {
    /// Bootstrap tool (`basestrap` by default).
    pub tool: String,
    pub target: PathBuf,
    pub packages: Vec<String>,
}

impl CommandArgs for BootstrapArgs {
    fn to_command_line(&self) -> String {
        let mut parts = vec![shell_quote(&self.tool), quote_path(&self.target)];
        parts.extend(self.packages.iter().map(|p| shell_quote(p)));
        parts.join(" ")
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// Append UUID-based mount entries to `{target}/etc/fstab`.
#[derive(Debug, Clone)]
pub struct FstabArgs {
    /// Fstab generator (`fstabgen` by default).
    pub tool: String,
    pub target: PathBuf,
}

impl CommandArgs for FstabArgs {
    fn to_command_line(&self) -> String {
        format!(
            "{} -U {} >> {}",
            shell_quote(&self.tool),
            quote_path(&self.target),
            quote_path(&self.target.join("etc/fstab"))
        )
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// `cp <source> <dest_dir>/`
#[derive(Debug, Clone)]
pub struct CopyFileArgs {
    pub source: PathBuf,
    pub dest_dir: PathBuf,
}

impl CommandArgs for CopyFileArgs {
    fn to_command_line(&self) -> String {
        format!("cp {} {}/", quote_path(&self.source), quote_path(&self.dest_dir))
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// Install a console font package on the live system.
#[derive(Debug, Clone)]
pub struct FontPackageArgs {
    pub package: String,
}

impl CommandArgs for FontPackageArgs {
    fn to_command_line(&self) -> String {
        format!("pacman -Sy {} --noconfirm", shell_quote(&self.package))
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct SetFontArgs {
    pub font: String,
}

impl CommandArgs for SetFontArgs {
    fn to_command_line(&self) -> String {
        format!("setfont {}", shell_quote(&self.font))
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// Run a program inside the target root through the chroot tool.
#[derive(Debug, Clone)]
pub struct ChrootRunArgs {
    /// Chroot tool (`artix-chroot` by default).
    pub tool: String,
    pub target: PathBuf,
    /// Program path as seen from inside the target.
    pub program: String,
}

impl CommandArgs for ChrootRunArgs {
    fn to_command_line(&self) -> String {
        format!(
            "{} {} {}",
            shell_quote(&self.tool),
            quote_path(&self.target),
            shell_quote(&self.program)
        )
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_lists_packages_in_order() {
        let args = BootstrapArgs {
            tool: "basestrap".into(),
            target: PathBuf::from("/mnt"),
            packages: vec!["base".into(), "base-devel".into(), "runit".into()],
        };
        assert_eq!(args.to_command_line(), "basestrap /mnt base base-devel runit");
        assert!(args.is_destructive());
    }

    #[test]
    fn test_fstab_appends_to_target() {
        let args = FstabArgs {
            tool: "fstabgen".into(),
            target: PathBuf::from("/mnt"),
        };
        assert_eq!(args.to_command_line(), "fstabgen -U /mnt >> /mnt/etc/fstab");
    }

    #[test]
    fn test_copy_pacman_conf() {
        let args = CopyFileArgs {
            source: PathBuf::from("/etc/pacman.conf"),
            dest_dir: PathBuf::from("/mnt/etc"),
        };
        assert_eq!(args.to_command_line(), "cp /etc/pacman.conf /mnt/etc/");
    }

    #[test]
    fn test_console_font_commands() {
        let pkg = FontPackageArgs {
            package: "terminus-font".into(),
        };
        assert_eq!(pkg.to_command_line(), "pacman -Sy terminus-font --noconfirm");
        let font = SetFontArgs {
            font: "ter-v20n".into(),
        };
        assert_eq!(font.to_command_line(), "setfont ter-v20n");
    }

    #[test]
    fn test_chroot_run() {
        let args = ChrootRunArgs {
            tool: "artix-chroot".into(),
            target: PathBuf::from("/mnt"),
            program: "/chroot_setup.sh".into(),
        };
        assert_eq!(args.to_command_line(), "artix-chroot /mnt /chroot_setup.sh");
    }
}
