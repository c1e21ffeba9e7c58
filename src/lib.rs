//! Quasar Linux installer library
//!
//! Stage pipeline for installing an Artix Linux (runit) based system onto a
//! local disk: disk selection, manual partitioning, formatting, base system
//! bootstrap, account provisioning, asset copying and in-target
//! configuration. The binary wires these to a real terminal and shell; the
//! `Reporter` and `Shell` traits let tests drive the same pipeline.

pub mod cli;
pub mod command_args;
pub mod command_runner;
pub mod config;
pub mod disk;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod install_log;
pub mod install_state;
pub mod installer;
pub mod logic;
pub mod process_guard;
pub mod reporter;
pub mod sanity;
pub mod scripts;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use command_args::CommandArgs;
pub use command_runner::{
    CommandResult, CommandRunner, FailPolicy, HostShell, Invocation, Progress, Shell,
};
pub use config::InstallerConfig;
pub use disk::{DeviceProbe, DiskDescriptor};
pub use error::{InstallerError, Result};
pub use install_log::InstallLog;
pub use install_state::{InstallStage, InstallTransitionError, InstallationContext};
pub use installer::Installer;
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use reporter::{NoticeLevel, Reporter, TerminalReporter};
pub use session::Session;
pub use types::{BootMode, DevicePath, Filesystem, MediaType, PartitionAssignment, Username};

// Storage engine
pub use engine::storage::{calculate_storage_plan, StorageOp, StoragePlan};
