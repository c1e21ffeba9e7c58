//! Disk inventory and selection
//!
//! Enumerates whole disks with `lsblk`, classifies each as rotational or
//! solid-state from sysfs, and runs the operator's disk choice loop.
//!
//! `DeviceProbe` holds the filesystem roots the checks read from, so tests
//! can point it at a temporary `/dev` and `/sys/block` tree.

use crate::command_runner::{FailPolicy, Progress};
use crate::error::Result;
use crate::reporter::NoticeLevel;
use crate::scripts::disk::ListDisksArgs;
use crate::session::Session;
use crate::types::{DevicePath, MediaType};
use std::fs;
use std::path::PathBuf;

/// Where device nodes and block-device attributes are looked up.
#[derive(Debug, Clone)]
pub struct DeviceProbe {
    dev_root: PathBuf,
    sys_block: PathBuf,
}

impl Default for DeviceProbe {
    fn default() -> Self {
        Self {
            dev_root: PathBuf::from("/"),
            sys_block: PathBuf::from("/sys/block"),
        }
    }
}

impl DeviceProbe {
    /// Probe rooted somewhere other than `/`: device paths resolve under
    /// `dev_root` and attributes under `sys_block`.
    pub fn with_roots(dev_root: impl Into<PathBuf>, sys_block: impl Into<PathBuf>) -> Self {
        Self {
            dev_root: dev_root.into(),
            sys_block: sys_block.into(),
        }
    }

    /// Whether the device node exists.
    pub fn device_exists(&self, device: &DevicePath) -> bool {
        let relative = device.as_str().trim_start_matches('/');
        self.dev_root.join(relative).exists()
    }

    fn rotational_flag(&self, name: &str) -> PathBuf {
        self.sys_block.join(name).join("queue").join("rotational")
    }
}

/// One whole disk as reported by `lsblk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskDescriptor {
    pub name: String,
    pub size: String,
    pub model: String,
    /// lsblk TYPE column (`disk`, `rom`, ...)
    pub kind: String,
    pub media: MediaType,
}

impl DiskDescriptor {
    /// Fixed-width row for the disk panel.
    pub fn display_row(&self) -> String {
        let model: String = self.model.chars().take(40).collect();
        format!(
            "{:6} {:8} {:40} {:4} {}",
            self.name, self.size, model, self.kind, self.media
        )
    }
}

/// Parse `lsblk -d -o NAME,SIZE,MODEL,TYPE -n` output.
///
/// Lines with fewer than three fields are skipped. The model is whatever
/// lies between SIZE and TYPE, so multi-word models survive and a missing
/// model is empty.
pub fn parse_lsblk(output: &str) -> Vec<DiskDescriptor> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }
            let last = parts.len() - 1;
            Some(DiskDescriptor {
                name: parts[0].to_string(),
                size: parts[1].to_string(),
                model: parts[2..last].join(" "),
                kind: parts[last].to_string(),
                media: MediaType::Unknown,
            })
        })
        .collect()
}

/// Classify a disk from `/sys/block/<name>/queue/rotational`.
/// Any read failure yields `MediaType::Unknown`.
pub fn classify_media(probe: &DeviceProbe, device: &DevicePath) -> MediaType {
    let path = probe.rotational_flag(device.name());
    match fs::read_to_string(&path) {
        Ok(raw) => MediaType::from_rotational_flag(&raw),
        Err(e) => {
            tracing::debug!("Cannot read {}: {}", path.display(), e);
            MediaType::Unknown
        }
    }
}

/// Enumerate whole disks and classify their media.
pub fn list_disks(session: &mut Session, probe: &DeviceProbe) -> Result<Vec<DiskDescriptor>> {
    let output = session
        .execute_args(&ListDisksArgs, FailPolicy::FailFast, Progress::Quiet)?
        .map(|r| r.stdout)
        .unwrap_or_default();

    let mut disks = parse_lsblk(&output);
    for disk in &mut disks {
        disk.media = match DevicePath::from_selection(&disk.name) {
            Ok(path) => classify_media(probe, &path),
            Err(_) => MediaType::Unknown,
        };
    }
    tracing::info!("Found {} disk(s)", disks.len());
    Ok(disks)
}

/// Ask the operator for the installation disk until a usable one is chosen.
///
/// Unparseable or nonexistent input re-prompts without side effects. A
/// rotational disk needs an explicit `y`; any other answer returns to the
/// disk list.
pub fn select_disk(
    session: &mut Session,
    probe: &DeviceProbe,
    disks: &[DiskDescriptor],
) -> Result<DevicePath> {
    let rows: Vec<String> = if disks.is_empty() {
        vec!["No disks reported by lsblk".to_string()]
    } else {
        disks.iter().map(DiskDescriptor::display_row).collect()
    };

    loop {
        session.reporter().show_panel(
            "AVAILABLE DISKS",
            &rows,
            Some("Enter the disk name (e.g. sda, nvme0n1)"),
        );
        let choice = session.reporter().prompt("Disk")?;

        let path = match DevicePath::from_selection(&choice) {
            Ok(path) if probe.device_exists(&path) => path,
            Ok(path) => {
                reject(session, path.as_str(), "does not exist");
                continue;
            }
            Err(e) => {
                reject(session, &choice, &e.to_string());
                continue;
            }
        };

        let media = classify_media(probe, &path);
        session
            .log()
            .append(format!("Selected disk: {} ({})", path, media));

        if media == MediaType::Rotational && !confirm_rotational(session, &path)? {
            session
                .log()
                .append(format!("Rotational disk {} declined", path));
            continue;
        }
        return Ok(path);
    }
}

fn reject(session: &mut Session, input: &str, reason: &str) {
    session
        .log()
        .append(format!("Invalid disk selected: {} ({})", input, reason));
    session
        .reporter()
        .notice(NoticeLevel::Error, &format!("Disk {} {}", input, reason));
}

fn confirm_rotational(session: &mut Session, path: &DevicePath) -> Result<bool> {
    session.reporter().show_panel(
        "WARNING: SLOW DISK",
        &[
            format!("{} is a rotational hard disk (HDD).", path),
            "System performance will be very low.".to_string(),
            "An SSD is recommended.".to_string(),
            String::new(),
            "Do you really want to install on this disk?".to_string(),
        ],
        Some("Enter 'y' to confirm or 'n' to cancel"),
    );
    let answer = session.reporter().prompt("Your choice (y/N)")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
