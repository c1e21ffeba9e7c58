//! Storage Engine
//!
//! Translates the boot mode and the operator's partition assignment into an
//! ordered sequence of atomic `StorageOp` operations.
//!
//! | Boot mode | Operations Generated |
//! |-----------|----------------------|
//! | UEFI      | Format boot (FAT32) → Format root (ext4) → Mount root → CreateDir boot/efi → Mount boot |
//! | BIOS      | Format boot (ext4) → Format root (ext4) → Mount root → CreateDir boot → Mount boot |
//!
//! # Design
//!
//! - **Pure logic**: no I/O, the stage in `logic::storage` executes the plan
//! - **Typed output**: format and mount ops map to `scripts::disk` arguments
//! - **Validated**: the plan is checked for ordering before it is returned

use crate::error::{InstallerError, Result};
use crate::types::{BootMode, DevicePath, Filesystem, PartitionAssignment};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single atomic storage operation in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// Create a filesystem on a partition
    FormatFs {
        device: DevicePath,
        filesystem: Filesystem,
    },

    /// Create a mountpoint directory (and its parents)
    CreateDir { path: PathBuf },

    /// Mount a device at a mountpoint
    Mount {
        device: DevicePath,
        mountpoint: PathBuf,
    },
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormatFs { device, filesystem } => {
                write!(f, "FormatFs({}, fs={})", device, filesystem)
            }
            Self::CreateDir { path } => write!(f, "CreateDir({})", path.display()),
            Self::Mount { device, mountpoint } => {
                write!(f, "Mount({} -> {})", device, mountpoint.display())
            }
        }
    }
}

/// A complete storage plan: an ordered list of operations.
#[derive(Debug, Clone)]
pub struct StoragePlan {
    pub ops: Vec<StorageOp>,
    pub boot_mode: BootMode,
    pub target_root: PathBuf,
}

impl StoragePlan {
    /// Mount point of the boot partition.
    pub fn boot_mount_path(&self) -> PathBuf {
        self.boot_mode.boot_mount_path(&self.target_root)
    }

    /// Returns a summary of the plan for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Storage Plan: {}", self.boot_mode),
            format!("  Target: {}", self.target_root.display()),
            format!("  Operations ({}):", self.ops.len()),
        ];
        for (i, op) in self.ops.iter().enumerate() {
            lines.push(format!("    {}. {}", i + 1, op));
        }
        lines.join("\n")
    }

    /// Check the ordering rules:
    /// - every mounted device was formatted earlier in the plan
    /// - the target root is mounted before anything else
    /// - every non-root mountpoint was created after the root mount
    pub fn validate(&self) -> Result<()> {
        let mut formatted: Vec<&DevicePath> = Vec::new();
        let mut created: Vec<&Path> = Vec::new();
        let mut root_mounted = false;

        for (i, op) in self.ops.iter().enumerate() {
            match op {
                StorageOp::FormatFs { device, .. } => {
                    if root_mounted {
                        return Err(plan_error(i, op, "formatting after mounting"));
                    }
                    formatted.push(device);
                }
                StorageOp::CreateDir { path } => {
                    if !root_mounted {
                        return Err(plan_error(i, op, "mountpoint created before root is mounted"));
                    }
                    created.push(path);
                }
                StorageOp::Mount { device, mountpoint } => {
                    if !formatted.contains(&device) {
                        return Err(plan_error(i, op, "device mounted before it was formatted"));
                    }
                    if mountpoint == &self.target_root {
                        root_mounted = true;
                    } else if !root_mounted {
                        return Err(plan_error(i, op, "mount before the target root"));
                    } else if !created.iter().any(|c| *c == mountpoint.as_path()) {
                        return Err(plan_error(i, op, "mountpoint was never created"));
                    }
                }
            }
        }

        if !root_mounted {
            return Err(InstallerError::validation(
                "Storage plan never mounts the target root",
            ));
        }
        Ok(())
    }
}

fn plan_error(index: usize, op: &StorageOp, reason: &str) -> InstallerError {
    InstallerError::validation(format!(
        "Invalid storage plan at step {} ({}): {}",
        index + 1,
        op,
        reason
    ))
}

/// Calculate the storage operation plan for a partition assignment.
///
/// # Errors
///
/// Returns a validation error if root and boot are the same device.
pub fn calculate_storage_plan(
    boot_mode: BootMode,
    partitions: &PartitionAssignment,
    target_root: &Path,
) -> Result<StoragePlan> {
    if partitions.root == partitions.boot {
        return Err(InstallerError::validation(format!(
            "Root and boot cannot both be {}",
            partitions.root
        )));
    }

    let boot_dir = boot_mode.boot_mount_path(target_root);
    let ops = vec![
        StorageOp::FormatFs {
            device: partitions.boot.clone(),
            filesystem: boot_mode.boot_filesystem(),
        },
        StorageOp::FormatFs {
            device: partitions.root.clone(),
            filesystem: Filesystem::Ext4,
        },
        StorageOp::Mount {
            device: partitions.root.clone(),
            mountpoint: target_root.to_path_buf(),
        },
        StorageOp::CreateDir {
            path: boot_dir.clone(),
        },
        StorageOp::Mount {
            device: partitions.boot.clone(),
            mountpoint: boot_dir,
        },
    ];

    let plan = StoragePlan {
        ops,
        boot_mode,
        target_root: target_root.to_path_buf(),
    };
    plan.validate()?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(root: &str, boot: &str) -> PartitionAssignment {
        PartitionAssignment {
            root: root.parse().expect("valid root"),
            boot: boot.parse().expect("valid boot"),
        }
    }

    #[test]
    fn test_uefi_plan() {
        let plan = calculate_storage_plan(
            BootMode::Uefi,
            &assignment("/dev/sda2", "/dev/sda1"),
            Path::new("/mnt"),
        )
        .expect("plan");

        assert_eq!(
            plan.ops,
            vec![
                StorageOp::FormatFs {
                    device: "/dev/sda1".parse().unwrap(),
                    filesystem: Filesystem::Fat32,
                },
                StorageOp::FormatFs {
                    device: "/dev/sda2".parse().unwrap(),
                    filesystem: Filesystem::Ext4,
                },
                StorageOp::Mount {
                    device: "/dev/sda2".parse().unwrap(),
                    mountpoint: PathBuf::from("/mnt"),
                },
                StorageOp::CreateDir {
                    path: PathBuf::from("/mnt/boot/efi"),
                },
                StorageOp::Mount {
                    device: "/dev/sda1".parse().unwrap(),
                    mountpoint: PathBuf::from("/mnt/boot/efi"),
                },
            ]
        );
        assert_eq!(plan.boot_mount_path(), PathBuf::from("/mnt/boot/efi"));
    }

    #[test]
    fn test_bios_plan_uses_ext4_boot() {
        let plan = calculate_storage_plan(
            BootMode::Bios,
            &assignment("/dev/vda2", "/dev/vda1"),
            Path::new("/target"),
        )
        .expect("plan");

        assert!(matches!(
            &plan.ops[0],
            StorageOp::FormatFs { filesystem: Filesystem::Ext4, .. }
        ));
        assert_eq!(
            plan.ops.last(),
            Some(&StorageOp::Mount {
                device: "/dev/vda1".parse().unwrap(),
                mountpoint: PathBuf::from("/target/boot"),
            })
        );
    }

    #[test]
    fn test_identical_partitions_rejected() {
        let err = calculate_storage_plan(
            BootMode::Uefi,
            &assignment("/dev/sda1", "/dev/sda1"),
            Path::new("/mnt"),
        )
        .unwrap_err();
        assert!(matches!(err, InstallerError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_boot_mounted_first() {
        let mut plan = calculate_storage_plan(
            BootMode::Uefi,
            &assignment("/dev/sda2", "/dev/sda1"),
            Path::new("/mnt"),
        )
        .expect("plan");
        plan.ops.swap(2, 4);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mount_of_unformatted_device() {
        let plan = StoragePlan {
            ops: vec![StorageOp::Mount {
                device: "/dev/sda2".parse().unwrap(),
                mountpoint: PathBuf::from("/mnt"),
            }],
            boot_mode: BootMode::Bios,
            target_root: PathBuf::from("/mnt"),
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_summary_lists_every_op() {
        let plan = calculate_storage_plan(
            BootMode::Uefi,
            &assignment("/dev/sda2", "/dev/sda1"),
            Path::new("/mnt"),
        )
        .expect("plan");
        let summary = plan.summary();
        assert!(summary.contains("Storage Plan: UEFI"));
        assert!(summary.contains("5. Mount(/dev/sda1 -> /mnt/boot/efi)"));
    }
}
