//! Type-safe command line contracts.
//!
//! Stages never format command lines by hand. Each host tool invocation has a
//! struct in `scripts/` implementing `CommandArgs`, built from validated value
//! types (`DevicePath`, `Username`) and quoted paths. The struct is the
//! single place where a tool's flags are spelled out.
//!
//! # Contract
//!
//! - `to_command_line()`: the exact `sh -c` line, free of secrets.
//! - `is_destructive()`: true if the command modifies disks, the target tree
//!   or the live system. Dry-run skips destructive commands.
//! - `secret_stdin()`: material written to the child's stdin, never logged.

use crate::command_runner::Invocation;
use zeroize::Zeroizing;

/// Trait for typed command arguments.
pub trait CommandArgs {
    /// The shell command line, exactly as it will be logged and executed.
    fn to_command_line(&self) -> String;

    /// Whether this command changes system state.
    ///
    /// Defaults to `false` for read-only queries (`lsblk`, `fdisk -l`).
    fn is_destructive(&self) -> bool {
        false
    }

    /// Secret data for the child's stdin (e.g., `chpasswd` input).
    fn secret_stdin(&self) -> Option<Zeroizing<String>> {
        None
    }

    /// Build the runner invocation for these arguments.
    fn to_invocation(&self) -> Invocation {
        let mut invocation = Invocation::new(self.to_command_line());
        if self.is_destructive() {
            invocation = invocation.destructive();
        }
        if let Some(secret) = self.secret_stdin() {
            invocation = invocation.with_secret_stdin(secret);
        }
        invocation
    }
}
