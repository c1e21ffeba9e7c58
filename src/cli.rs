use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quasar Linux installer - installs Artix Linux with runit onto a local disk
#[derive(Parser, Debug)]
#[command(name = "quasar-installer")]
#[command(about = "Interactive terminal installer for Quasar Linux (Artix base, runit)")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file. Missing fields take their defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for install.log (overrides the configuration)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Target root the new system is mounted at (overrides the configuration)
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Directory holding branding, follow-up scripts and the service shim
    #[arg(long)]
    pub asset_dir: Option<PathBuf>,

    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Destructive commands (format, mount, bootstrap, chroot) are skipped
    /// and logged. Read-only probes (lsblk, fdisk -l) still run so the
    /// prompts show real disks.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Debug-level diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interactive installer (default)
    Install,
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        file: PathBuf,
    },
    /// Print the effective configuration as JSON
    PrintConfig,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
