//! Type-safe values for the installer
//!
//! Enums replace stringly-typed boot and filesystem choices, and the
//! validated path/name types guarantee that nothing the operator types is
//! interpolated into a command line before it has been checked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{Display, EnumString};
use thiserror::Error;

/// Boot firmware mode, detected once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
pub enum BootMode {
    #[strum(to_string = "UEFI", serialize = "uefi")]
    Uefi,
    #[strum(to_string = "BIOS", serialize = "bios")]
    Bios,
}

impl BootMode {
    /// Filesystem the boot partition is formatted with.
    pub fn boot_filesystem(self) -> Filesystem {
        match self {
            Self::Uefi => Filesystem::Fat32,
            Self::Bios => Filesystem::Ext4,
        }
    }

    /// Boot mount point relative to the target root.
    pub fn boot_subpath(self) -> &'static str {
        match self {
            Self::Uefi => "boot/efi",
            Self::Bios => "boot",
        }
    }

    /// Absolute boot mount point under `target_root`.
    pub fn boot_mount_path(self, target_root: &Path) -> PathBuf {
        target_root.join(self.boot_subpath())
    }
}

/// Filesystem type for partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
pub enum Filesystem {
    #[strum(serialize = "ext4")]
    Ext4,
    /// FAT32 filesystem for the EFI System Partition
    #[strum(serialize = "fat32")]
    Fat32,
}

impl Filesystem {
    /// The mkfs program for this filesystem.
    pub fn mkfs_program(self) -> &'static str {
        match self {
            Self::Ext4 => "mkfs.ext4",
            Self::Fat32 => "mkfs.fat",
        }
    }

    /// Flags passed to the mkfs program before the device.
    pub fn mkfs_flags(self) -> &'static [&'static str] {
        match self {
            Self::Ext4 => &["-F"],
            Self::Fat32 => &["-F32"],
        }
    }
}

/// Storage media classification, read from sysfs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
pub enum MediaType {
    #[strum(serialize = "HDD (rotational)")]
    Rotational,
    #[strum(serialize = "SSD (solid-state)")]
    SolidState,
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl MediaType {
    /// Parse the contents of `/sys/block/<dev>/queue/rotational`.
    pub fn from_rotational_flag(raw: &str) -> Self {
        match raw.trim() {
            "1" => Self::Rotational,
            "0" => Self::SolidState,
            _ => Self::Unknown,
        }
    }
}

/// Rejected operator input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Invalid device path '{value}': {reason}")]
    DevicePath { value: String, reason: &'static str },

    #[error("Invalid username '{value}': {reason}")]
    Username { value: String, reason: &'static str },
}

impl From<ValueError> for crate::error::InstallerError {
    fn from(err: ValueError) -> Self {
        crate::error::InstallerError::Validation(err.to_string())
    }
}

/// A block device path under `/dev`, safe to place on a command line.
///
/// Accepted characters are `[A-Za-z0-9/_.:-]`; `..` segments are refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DevicePath(String);

impl DevicePath {
    /// Parse operator disk input: a bare name (`sda`, `nvme0n1`) or a full path.
    pub fn from_selection(input: &str) -> Result<Self, ValueError> {
        let input = input.trim();
        if input.starts_with('/') {
            input.parse()
        } else {
            format!("/dev/{}", input).parse()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Kernel device name (`/dev/nvme0n1` -> `nvme0n1`).
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// True if this path names a partition of `disk`: `/dev/sda2` on
    /// `/dev/sda`, `/dev/nvme0n1p2` on `/dev/nvme0n1`.
    pub fn is_partition_of(&self, disk: &DevicePath) -> bool {
        let Some(rest) = self.0.strip_prefix(disk.as_str()) else {
            return false;
        };
        let number = if disk.0.ends_with(|c: char| c.is_ascii_digit()) {
            match rest.strip_prefix('p') {
                Some(number) => number,
                None => return false,
            }
        } else {
            rest
        };
        !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit())
    }
}

impl FromStr for DevicePath {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ValueError::DevicePath {
            value: s.to_string(),
            reason,
        };

        let Some(rest) = s.strip_prefix("/dev/") else {
            return Err(err("must start with /dev/"));
        };
        if rest.is_empty() {
            return Err(err("missing device name"));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '.' | ':' | '-'))
        {
            return Err(err("contains characters outside [A-Za-z0-9/_.:-]"));
        }
        if rest.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(err("contains an empty or relative path segment"));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for DevicePath {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DevicePath> for String {
    fn from(value: DevicePath) -> Self {
        value.0
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for DevicePath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

/// A login name matching `^[a-z_][a-z0-9_-]{0,31}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Username {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ValueError::Username {
            value: s.to_string(),
            reason,
        };

        let mut chars = s.chars();
        match chars.next() {
            None => return Err(err("must not be empty")),
            Some(c) if c.is_ascii_lowercase() || c == '_' => {}
            Some(_) => return Err(err("must start with a lowercase letter or underscore")),
        }
        if s.len() > 32 {
            return Err(err("must be at most 32 characters"));
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
            return Err(err("may only contain a-z, 0-9, '_' and '-'"));
        }
        if s == "root" {
            return Err(err("root is provisioned separately"));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Username {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operator-declared roles of the two partitions the system is installed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionAssignment {
    pub root: DevicePath,
    pub boot: DevicePath,
}

/// Quote a word for `sh` unless it is made only of safe characters.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '.' | ':' | '-' | ',' | '=' | '+' | '@')
        });
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
