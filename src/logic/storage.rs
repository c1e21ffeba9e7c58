//! Partition, format and mount stages.
//!
//! Partitioning is manual: the operator edits the table in the partition
//! tool and then declares which partition is root and which is boot. Format
//! and mount operations come from the `engine::storage` plan and are all
//! fail-fast.

use crate::command_runner::{FailPolicy, Progress};
use crate::disk::DeviceProbe;
use crate::engine::storage::{StorageOp, StoragePlan};
use crate::error::Result;
use crate::reporter::NoticeLevel;
use crate::scripts::disk::{FormatArgs, MountArgs, PartitionTableArgs, PartitionToolArgs};
use crate::session::Session;
use crate::types::{DevicePath, PartitionAssignment};
use std::fs;

/// Hand the disk to the partition tool, then show the resulting table.
///
/// Returns the device lines of the partition table.
pub fn partition_disk(session: &mut Session, tool: &str, disk: &DevicePath) -> Result<Vec<String>> {
    session.reporter().show_panel(
        "DISK PARTITIONING",
        &[
            format!("{} will be started for disk {}", tool, disk),
            String::new(),
            "1. Create the boot and root partitions".to_string(),
            "2. Set the partition types".to_string(),
            "3. Write the changes and quit".to_string(),
        ],
        Some(&format!("Press Enter to start {}...", tool)),
    );
    session.reporter().pause("")?;

    session.run_interactive(&PartitionToolArgs {
        tool: tool.to_string(),
        disk: disk.clone(),
    })?;
    session.log().append(format!("Partitioned disk: {}", disk));

    let table = partition_table(session, disk)?;
    session.reporter().show_panel(
        "PARTITIONING RESULT",
        &table,
        Some("Partitioning complete. Press Enter to continue..."),
    );
    session.reporter().pause("")?;
    Ok(table)
}

/// Device lines (`/dev/...`) of `fdisk -l <disk>`.
pub fn partition_table(session: &mut Session, disk: &DevicePath) -> Result<Vec<String>> {
    let output = session
        .execute_args(
            &PartitionTableArgs { disk: disk.clone() },
            FailPolicy::FailFast,
            Progress::Quiet,
        )?
        .map(|r| r.stdout)
        .unwrap_or_default();

    let lines: Vec<String> = output
        .lines()
        .filter(|l| l.starts_with('/'))
        .map(str::to_string)
        .collect();
    session
        .log()
        .append(format!("Partition info:\n{}", lines.join("\n")));
    Ok(lines)
}

/// Ask for the root and boot partitions.
///
/// Unparseable or nonexistent paths and identical root/boot answers
/// re-prompt. Partitions outside the selected disk are accepted with a
/// warning.
pub fn assign_partitions(
    session: &mut Session,
    probe: &DeviceProbe,
    disk: &DevicePath,
    table: &[String],
) -> Result<PartitionAssignment> {
    loop {
        session
            .reporter()
            .show_panel("PARTITION LIST", table, Some("Assign the ROOT and BOOT partitions"));

        let root = prompt_device(session, probe, "ROOT partition (e.g. /dev/sda2)")?;
        let boot = prompt_device(session, probe, "BOOT/EFI partition (e.g. /dev/sda1)")?;

        if root == boot {
            session
                .log()
                .append(format!("Rejected partitions: ROOT and BOOT/EFI are both {}", root));
            session.reporter().notice(
                NoticeLevel::Error,
                "ROOT and BOOT/EFI must be different partitions",
            );
            continue;
        }

        for part in [&root, &boot] {
            if !part.is_partition_of(disk) {
                session
                    .log()
                    .append(format!("Warning: {} is not a partition of {}", part, disk));
                session.reporter().notice(
                    NoticeLevel::Warning,
                    &format!("{} is not on the selected disk {}", part, disk),
                );
            }
        }

        session.log().append(format!(
            "Selected partitions: ROOT={}, BOOT/EFI={}",
            root, boot
        ));
        return Ok(PartitionAssignment { root, boot });
    }
}

fn prompt_device(session: &mut Session, probe: &DeviceProbe, label: &str) -> Result<DevicePath> {
    loop {
        let input = session.reporter().prompt(label)?;
        match input.trim().parse::<DevicePath>() {
            Ok(path) if probe.device_exists(&path) => return Ok(path),
            Ok(path) => {
                session
                    .log()
                    .append(format!("Invalid partition entered: {} does not exist", path));
                session
                    .reporter()
                    .notice(NoticeLevel::Error, &format!("Partition {} does not exist", path));
            }
            Err(e) => {
                session.log().append(format!("Invalid partition entered: {}", e));
                session.reporter().notice(NoticeLevel::Error, &e.to_string());
            }
        }
    }
}

/// Run the plan's format operations.
pub fn format_partitions(session: &mut Session, plan: &StoragePlan) -> Result<()> {
    let lines: Vec<String> = plan
        .ops
        .iter()
        .filter_map(|op| match op {
            StorageOp::FormatFs { device, filesystem } => {
                Some(format!("{} -> {}", device, filesystem))
            }
            _ => None,
        })
        .collect();
    session
        .reporter()
        .show_panel("FORMATTING PARTITIONS", &lines, Some("Formatting..."));

    for op in &plan.ops {
        if let StorageOp::FormatFs { device, filesystem } = op {
            let args = FormatArgs {
                device: device.clone(),
                filesystem: *filesystem,
            };
            session.execute_args(&args, FailPolicy::FailFast, Progress::Stream)?;
        }
    }

    session
        .reporter()
        .notice(NoticeLevel::Success, "Formatting complete");
    session.log().append("Partitions formatted successfully");
    Ok(())
}

/// Run the plan's mountpoint and mount operations in order.
pub fn mount_partitions(session: &mut Session, plan: &StoragePlan) -> Result<()> {
    let lines: Vec<String> = plan
        .ops
        .iter()
        .filter_map(|op| match op {
            StorageOp::Mount { device, mountpoint } => {
                Some(format!("{} -> {}", device, mountpoint.display()))
            }
            _ => None,
        })
        .collect();
    session
        .reporter()
        .show_panel("MOUNTING PARTITIONS", &lines, Some("Mounting..."));

    for op in &plan.ops {
        match op {
            StorageOp::FormatFs { .. } => {}
            StorageOp::CreateDir { path } => {
                if session.is_dry_run() {
                    session
                        .log()
                        .append(format!("DRY-RUN: skipped mkdir -p {}", path.display()));
                } else {
                    fs::create_dir_all(path)?;
                    session.log().append(format!("Created {}", path.display()));
                }
            }
            StorageOp::Mount { device, mountpoint } => {
                let args = MountArgs {
                    device: device.clone(),
                    mountpoint: mountpoint.clone(),
                };
                session.execute_args(&args, FailPolicy::FailFast, Progress::Stream)?;
            }
        }
    }

    session
        .reporter()
        .notice(NoticeLevel::Success, "Mounting complete");
    session.log().append("Partitions mounted successfully");
    Ok(())
}
