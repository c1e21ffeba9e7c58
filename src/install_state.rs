//! Install State Machine
//!
//! `InstallationContext` is the single source of truth for a run: the boot
//! mode detected at startup, every decision the operator made, and the
//! current pipeline stage. It enforces valid stage transitions so stages
//! cannot be skipped or reordered.
//!
//! # Design Principles
//!
//! - **Single Source of Truth**: one context per run, owned by the driver
//! - **Validated Transitions**: only forward transitions to the next stage
//! - **Prerequisites**: a stage cannot be entered before the data it needs
//!   has been recorded (e.g. no formatting without a partition assignment)
//! - **Set Once**: the selected disk, the partitions and the username can be
//!   recorded exactly once
//!
//! # Stage Flow
//!
//! ```text
//! NotStarted
//!     ↓
//! SelectingDisk
//!     ↓
//! PartitioningDisk          (requires selected disk)
//!     ↓
//! FormattingPartitions      (requires partition assignment)
//!     ↓
//! MountingPartitions
//!     ↓
//! InstallingBaseSystem
//!     ↓
//! ProvisioningAccounts      (requires username)
//!     ↓
//! CopyingAssets
//!     ↓
//! ConfiguringChroot         (requires username)
//!     ↓
//! Finalizing
//!     ↓
//! Completed
//!
//! (Any stage can transition to Failed)
//! ```

use crate::error::InstallerError;
use crate::types::{BootMode, DevicePath, PartitionAssignment, Username};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Installation stages in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallStage {
    /// Installation has not started yet
    NotStarted = 0,

    /// Enumerating disks and waiting for the operator's choice
    SelectingDisk = 1,

    /// Operator edits the partition table with the interactive tool
    PartitioningDisk = 2,

    /// Creating filesystems on the assigned partitions
    FormattingPartitions = 3,

    /// Mounting root, then boot, under the target root
    MountingPartitions = 4,

    /// Bulk package install, fstab and package manager config
    InstallingBaseSystem = 5,

    /// User account, groups and passwords
    ProvisioningAccounts = 6,

    /// Best-effort copies of branding and follow-up scripts
    CopyingAssets = 7,

    /// Second-stage script inside the target (bootloader, locale, services)
    ConfiguringChroot = 8,

    /// Unmount and summary
    Finalizing = 9,

    /// Installation completed successfully (terminal state)
    Completed = 10,

    /// Installation failed (terminal state)
    Failed = 255,
}

impl InstallStage {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true if this is a terminal state (Completed or Failed)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the next stage in the sequence, or None if at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::SelectingDisk),
            Self::SelectingDisk => Some(Self::PartitioningDisk),
            Self::PartitioningDisk => Some(Self::FormattingPartitions),
            Self::FormattingPartitions => Some(Self::MountingPartitions),
            Self::MountingPartitions => Some(Self::InstallingBaseSystem),
            Self::InstallingBaseSystem => Some(Self::ProvisioningAccounts),
            Self::ProvisioningAccounts => Some(Self::CopyingAssets),
            Self::CopyingAssets => Some(Self::ConfiguringChroot),
            Self::ConfiguringChroot => Some(Self::Finalizing),
            Self::Finalizing => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::SelectingDisk => "Selecting disk",
            Self::PartitioningDisk => "Partitioning disk",
            Self::FormattingPartitions => "Formatting partitions",
            Self::MountingPartitions => "Mounting partitions",
            Self::InstallingBaseSystem => "Installing base system",
            Self::ProvisioningAccounts => "Creating accounts",
            Self::CopyingAssets => "Copying system files",
            Self::ConfiguringChroot => "Configuring system",
            Self::Finalizing => "Finalizing installation",
            Self::Completed => "Installation complete",
            Self::Failed => "Installation failed",
        }
    }

    /// Returns all stages in order (excluding Failed)
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::NotStarted,
            Self::SelectingDisk,
            Self::PartitioningDisk,
            Self::FormattingPartitions,
            Self::MountingPartitions,
            Self::InstallingBaseSystem,
            Self::ProvisioningAccounts,
            Self::CopyingAssets,
            Self::ConfiguringChroot,
            Self::Finalizing,
            Self::Completed,
        ]
    }

    /// Number of working stages between NotStarted and Completed.
    pub const fn working_stage_count() -> usize {
        Self::all_stages().len() - 2
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallTransitionError {
    /// Attempted to skip one or more stages
    #[error("Cannot skip from {from} to {to} (must transition through intermediate stages)")]
    SkippedStage {
        from: InstallStage,
        to: InstallStage,
    },

    /// Attempted to go backwards (not allowed)
    #[error("Cannot go backwards from {from} to {to} (installation is forward-only)")]
    BackwardTransition {
        from: InstallStage,
        to: InstallStage,
    },

    /// Attempted to transition from a terminal state
    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: InstallStage },

    /// A stage was entered before the data it depends on was recorded
    #[error("Stage {stage} requires {field} to be set first")]
    MissingPrerequisite {
        stage: InstallStage,
        field: &'static str,
    },

    /// Attempted to transition to the same state
    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: InstallStage },
}

impl From<InstallTransitionError> for InstallerError {
    fn from(err: InstallTransitionError) -> Self {
        InstallerError::InstallTransition(err.to_string())
    }
}

/// Default mount point of the new system.
pub const DEFAULT_TARGET_ROOT: &str = "/mnt";

/// Everything the pipeline knows about the current run.
#[derive(Debug, Clone)]
pub struct InstallationContext {
    boot_mode: BootMode,
    target_root: PathBuf,
    packages: Vec<String>,

    selected_disk: Option<DevicePath>,
    partitions: Option<PartitionAssignment>,
    username: Option<Username>,

    current: InstallStage,
    failed_at: Option<InstallStage>,
    /// Stage transitions with unix timestamps
    stage_history: Vec<(InstallStage, u64)>,
}

impl InstallationContext {
    /// Create a context in the NotStarted state. The boot mode is fixed for
    /// the lifetime of the run.
    pub fn new(boot_mode: BootMode, target_root: impl Into<PathBuf>, packages: Vec<String>) -> Self {
        Self {
            boot_mode,
            target_root: target_root.into(),
            packages,
            selected_disk: None,
            partitions: None,
            username: None,
            current: InstallStage::NotStarted,
            failed_at: None,
            stage_history: Vec::with_capacity(InstallStage::all_stages().len()),
        }
    }

    #[inline]
    pub fn boot_mode(&self) -> BootMode {
        self.boot_mode
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// Boot partition mount point for this run's boot mode.
    pub fn boot_mount_path(&self) -> PathBuf {
        self.boot_mode.boot_mount_path(&self.target_root)
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn selected_disk(&self) -> Option<&DevicePath> {
        self.selected_disk.as_ref()
    }

    pub fn partitions(&self) -> Option<&PartitionAssignment> {
        self.partitions.as_ref()
    }

    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    pub fn set_selected_disk(&mut self, disk: DevicePath) -> Result<(), InstallerError> {
        set_once(&mut self.selected_disk, disk, "selected disk")
    }

    pub fn set_partitions(&mut self, partitions: PartitionAssignment) -> Result<(), InstallerError> {
        set_once(&mut self.partitions, partitions, "partition assignment")
    }

    pub fn set_username(&mut self, username: Username) -> Result<(), InstallerError> {
        set_once(&mut self.username, username, "username")
    }

    /// Returns the selected disk or an error naming the stage that needed it.
    pub fn require_disk(&self) -> Result<&DevicePath, InstallerError> {
        self.selected_disk
            .as_ref()
            .ok_or_else(|| self.missing("selected disk"))
    }

    pub fn require_partitions(&self) -> Result<&PartitionAssignment, InstallerError> {
        self.partitions
            .as_ref()
            .ok_or_else(|| self.missing("partition assignment"))
    }

    pub fn require_username(&self) -> Result<&Username, InstallerError> {
        self.username.as_ref().ok_or_else(|| self.missing("username"))
    }

    fn missing(&self, field: &'static str) -> InstallerError {
        InstallTransitionError::MissingPrerequisite {
            stage: self.current,
            field,
        }
        .into()
    }

    #[inline]
    pub fn current_stage(&self) -> InstallStage {
        self.current
    }

    /// Returns the stage at which failure occurred, if any
    #[inline]
    pub fn failed_at(&self) -> Option<InstallStage> {
        self.failed_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == InstallStage::Completed
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.current == InstallStage::Failed
    }

    pub fn stage_history(&self) -> &[(InstallStage, u64)] {
        &self.stage_history
    }

    /// Transition to a specific stage (must be the next stage in sequence).
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if current is a terminal state
    /// - `AlreadyAtStage` if target is the current stage
    /// - `BackwardTransition` if target is before current
    /// - `SkippedStage` if target is not the immediate next stage
    /// - `MissingPrerequisite` if the data the stage needs is not recorded
    pub fn transition_to(
        &mut self,
        target: InstallStage,
    ) -> Result<InstallStage, InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }
        if target == self.current {
            return Err(InstallTransitionError::AlreadyAtStage { stage: target });
        }
        // Failed is only reachable through fail()
        if target == InstallStage::Failed {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }
        if target.order() < self.current.order() {
            return Err(InstallTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }
        if self.current.next() != Some(target) {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }
        if let Some(field) = self.unmet_prerequisite(target) {
            return Err(InstallTransitionError::MissingPrerequisite {
                stage: target,
                field,
            });
        }

        self.record_stage_transition(target);
        self.current = target;
        Ok(target)
    }

    /// Advance to the next stage in sequence.
    pub fn advance(&mut self) -> Result<InstallStage, InstallTransitionError> {
        match self.current.next() {
            Some(next) => self.transition_to(next),
            None => Err(InstallTransitionError::FromTerminalState { from: self.current }),
        }
    }

    fn unmet_prerequisite(&self, stage: InstallStage) -> Option<&'static str> {
        match stage {
            InstallStage::PartitioningDisk if self.selected_disk.is_none() => Some("selected disk"),
            InstallStage::FormattingPartitions if self.partitions.is_none() => {
                Some("partition assignment")
            }
            InstallStage::ProvisioningAccounts | InstallStage::ConfiguringChroot
                if self.username.is_none() =>
            {
                Some("username")
            }
            _ => None,
        }
    }

    /// Mark the installation as failed, recording the stage it failed in.
    pub fn fail(&mut self) -> Result<(), InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        self.failed_at = Some(self.current);
        self.record_stage_transition(InstallStage::Failed);
        self.current = InstallStage::Failed;
        Ok(())
    }

    fn record_stage_transition(&mut self, stage: InstallStage) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.stage_history.push((stage, timestamp));
        tracing::debug!("Install stage -> {}", stage);
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &str) -> Result<(), InstallerError> {
    if slot.is_some() {
        return Err(InstallerError::context(format!("{} is already set", name)));
    }
    *slot = Some(value);
    Ok(())
}
