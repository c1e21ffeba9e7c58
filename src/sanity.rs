//! Pre-flight sanity checks for runtime environment
//!
//! This module verifies the system environment before the first stage:
//! - Running with root privileges (EUID 0), which is mandatory
//! - External programs the configured pipeline calls are on `PATH`, which
//!   is only reported as a warning

use crate::config::InstallerConfig;

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

/// Programs invoked on the live system regardless of configuration.
const BASE_BINARIES: &[&str] = &[
    "sh",        // Command execution
    "lsblk",     // Disk listing (util-linux)
    "fdisk",     // Partition table listing (util-linux)
    "mkfs.ext4", // Root filesystem (e2fsprogs)
    "mkfs.fat",  // Boot filesystem (dosfstools)
    "mount",
    "umount",
    "cp",
    "chown",
];

/// Every program the configured pipeline runs on the live system.
pub fn required_binaries(config: &InstallerConfig) -> Vec<String> {
    let mut binaries: Vec<String> = BASE_BINARIES.iter().map(|b| b.to_string()).collect();
    let mut extra = vec![
        config.partition_tool.as_str(),
        config.chroot_tool.as_str(),
        config.bootstrap_tool.as_str(),
        config.fstab_tool.as_str(),
    ];
    if config.console_font.is_some() {
        extra.extend(["pacman", "setfont"]);
    }
    for binary in extra {
        if !binaries.iter().any(|b| b == binary) {
            binaries.push(binary.to_string());
        }
    }
    binaries
}

/// Check if a binary is available in PATH
pub fn binary_exists(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Check if running as root (EUID 0)
pub fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Perform all sanity checks and return the result
pub fn verify_environment(config: &InstallerConfig) -> SanityCheckResult {
    let missing_binaries: Vec<String> = required_binaries(config)
        .into_iter()
        .filter(|b| !binary_exists(b))
        .collect();
    for binary in &missing_binaries {
        tracing::warn!("Required program not found: {}", binary);
    }

    SanityCheckResult {
        missing_binaries,
        is_root: is_running_as_root(),
    }
}
