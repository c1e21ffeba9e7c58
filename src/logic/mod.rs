//! Stage implementations driven by `installer::Installer`.
//!
//! Each function takes the shared `Session` and performs one user-visible
//! step. Fatal failures propagate as `InstallerError`; recoverable ones are
//! logged and reported through the return value.
//!
//! # Modules
//!
//! - `preinstall`: console font, boot mode announcement
//! - `storage`: manual partitioning, partition assignment, format, mount
//! - `base_system`: bootstrap, fstab, package config, asset copy
//! - `accounts`: user creation and passwords
//! - `chroot`: second-stage script inside the target
//! - `postinstall`: summary and unmount

pub mod accounts;
pub mod base_system;
pub mod chroot;
pub mod postinstall;
pub mod preinstall;
pub mod storage;
