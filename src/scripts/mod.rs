//! Typed command lines for every host tool the installer runs.
//!
//! Each struct implements `CommandArgs` and is the only place its tool's
//! flags are spelled out. Fields are validated value types or paths, and
//! every path is shell-quoted when the line is rendered.

pub mod chroot;
pub mod disk;
pub mod system;
pub mod user;

use crate::types::shell_quote;
use std::path::Path;

/// Render a path as a single `sh` word.
pub(crate) fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}
