//! Typed arguments for disk tools: enumeration, partitioning, formatting and
//! mounting.

use super::quote_path;
use crate::command_args::CommandArgs;
use crate::types::{shell_quote, DevicePath, Filesystem};
use std::path::PathBuf;

/// `lsblk` listing of whole disks: one `NAME SIZE MODEL... TYPE` line each.
#[derive(Debug, Clone, Default)]
pub struct ListDisksArgs;

impl CommandArgs for ListDisksArgs {
    fn to_command_line(&self) -> String {
        "lsblk -d -o NAME,SIZE,MODEL,TYPE -n".to_string()
    }
}

/// `fdisk -l <disk>`: partition table listing.
#[derive(Debug, Clone)]
pub struct PartitionTableArgs {
    pub disk: DevicePath,
}

impl CommandArgs for PartitionTableArgs {
    fn to_command_line(&self) -> String {
        format!("fdisk -l {}", self.disk)
    }
}

/// Interactive partition editor run against the selected disk.
#[derive(Debug, Clone)]
pub struct PartitionToolArgs {
    /// Tool name (`cfdisk` by default).
    pub tool: String,
    pub disk: DevicePath,
}

impl CommandArgs for PartitionToolArgs {
    fn to_command_line(&self) -> String {
        format!("{} {}", shell_quote(&self.tool), self.disk)
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// Create a filesystem on a partition.
///
/// | Filesystem | Command line              |
/// |------------|---------------------------|
/// | `Fat32`    | `mkfs.fat -F32 <device>`  |
/// | `Ext4`     | `mkfs.ext4 -F <device>`   |
#[derive(Debug, Clone)]
pub struct FormatArgs {
    pub device: DevicePath,
    pub filesystem: Filesystem,
}

impl CommandArgs for FormatArgs {
    fn to_command_line(&self) -> String {
        let mut parts = vec![self.filesystem.mkfs_program().to_string()];
        parts.extend(self.filesystem.mkfs_flags().iter().map(|f| f.to_string()));
        parts.push(self.device.to_string());
        parts.join(" ")
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct MountArgs {
    pub device: DevicePath,
    pub mountpoint: PathBuf,
}

impl CommandArgs for MountArgs {
    fn to_command_line(&self) -> String {
        format!("mount {} {}", self.device, quote_path(&self.mountpoint))
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// `umount -R <target>`: tear down the whole target mount tree.
#[derive(Debug, Clone)]
pub struct UnmountArgs {
    pub target: PathBuf,
}

impl CommandArgs for UnmountArgs {
    fn to_command_line(&self) -> String {
        format!("umount -R {}", quote_path(&self.target))
    }

    fn is_destructive(&self) -> bool {
        true
    }
}
