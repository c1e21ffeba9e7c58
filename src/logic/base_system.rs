//! Base system installation and asset copying.
//!
//! Bootstrap, fstab generation and the host package-manager config copy are
//! fatal on failure. Asset copying is best-effort: each asset is attempted
//! independently and the outcome is collected in an [`AssetReport`].

use crate::command_runner::{FailPolicy, Progress};
use crate::config::InstallerConfig;
use crate::error::Result;
use crate::reporter::NoticeLevel;
use crate::scripts::system::{BootstrapArgs, CopyFileArgs, FstabArgs};
use crate::scripts::user::ChownArgs;
use crate::session::Session;
use crate::types::Username;
use std::fmt;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const EXECUTABLE_MODE: u32 = 0o755;

/// Install the full package set into the target root.
pub fn install_packages(
    session: &mut Session,
    config: &InstallerConfig,
    target: &Path,
    packages: &[String],
) -> Result<()> {
    let mut lines = vec![format!("Installing {} packages into {}", packages.len(), target.display())];
    lines.extend(packages.chunks(6).map(|chunk| chunk.join(" ")));
    session
        .reporter()
        .show_panel("SYSTEM INSTALLATION", &lines, Some("This can take a while..."));

    let args = BootstrapArgs {
        tool: config.bootstrap_tool.clone(),
        target: target.to_path_buf(),
        packages: packages.to_vec(),
    };
    session.execute_args(&args, FailPolicy::FailFast, Progress::Stream)?;
    session.log().append("Base system installed");
    Ok(())
}

pub fn generate_fstab(session: &mut Session, config: &InstallerConfig, target: &Path) -> Result<()> {
    let args = FstabArgs {
        tool: config.fstab_tool.clone(),
        target: target.to_path_buf(),
    };
    session.execute_args(&args, FailPolicy::FailFast, Progress::Stream)?;
    session.log().append("fstab generated");
    Ok(())
}

/// Copy the live system's package-manager config into `{target}/etc/`.
pub fn copy_host_package_config(
    session: &mut Session,
    config: &InstallerConfig,
    target: &Path,
) -> Result<()> {
    let args = CopyFileArgs {
        source: config.host_package_config.clone(),
        dest_dir: target.join("etc"),
    };
    session.execute_args(&args, FailPolicy::FailFast, Progress::Stream)?;
    Ok(())
}

/// Per-asset outcome of [`copy_assets`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub copied: Vec<String>,
    /// Assets absent from the asset directory.
    pub skipped: Vec<String>,
    /// `(asset, reason)`
    pub failed: Vec<(String, String)>,
}

impl AssetReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for AssetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} skipped, {} failed",
            self.copied.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Copy branding, follow-up scripts and the service shim into the target.
pub fn copy_assets(
    session: &mut Session,
    config: &InstallerConfig,
    target: &Path,
    username: &Username,
) -> Result<AssetReport> {
    let source_dir = config.resolved_asset_dir();
    let mut report = AssetReport::default();
    session.log().append(format!(
        "Copying assets from {}",
        source_dir.display()
    ));

    // Branding tree
    let branding = source_dir.join(&config.branding_dir);
    let branding_dest = under_target(target, &config.branding_dest);
    if branding.is_dir() {
        let name = config.branding_dir.clone();
        match copy_step(session, &branding, &branding_dest, |src, dst| copy_tree(src, dst).map(|_| ())) {
            Ok(()) => report.copied.push(name),
            Err(e) => report.failed.push((name, e.to_string())),
        }
    } else {
        report.skipped.push(config.branding_dir.clone());
    }

    // Follow-up scripts into the user's home
    let home = target.join("home").join(username.as_str());
    for script in &config.follow_up_scripts {
        let src = source_dir.join(script);
        if !src.is_file() {
            report.skipped.push(script.clone());
            continue;
        }
        let dest = home.join(script);
        if let Err(e) = copy_step(session, &src, &dest, copy_executable) {
            report.failed.push((script.clone(), e.to_string()));
            continue;
        }

        let chown = ChownArgs {
            chroot_tool: config.chroot_tool.clone(),
            target: target.to_path_buf(),
            owner: username.clone(),
            path: Path::new("/home").join(username.as_str()).join(script),
        };
        match session.execute_args(&chown, FailPolicy::Continue, Progress::Quiet)? {
            Some(_) => report.copied.push(script.clone()),
            None => report
                .failed
                .push((script.clone(), "ownership not changed".to_string())),
        }
    }

    // systemctl shim
    let shim = source_dir.join(&config.service_shim);
    if shim.is_file() {
        let dest = under_target(target, &config.service_shim_dest).join(&config.service_shim);
        match copy_step(session, &shim, &dest, copy_executable) {
            Ok(()) => report.copied.push(config.service_shim.clone()),
            Err(e) => report.failed.push((config.service_shim.clone(), e.to_string())),
        }
    } else {
        report.skipped.push(config.service_shim.clone());
    }

    for name in &report.skipped {
        session
            .log()
            .append(format!("Asset not found, skipped: {}", name));
    }
    for (name, reason) in &report.failed {
        session
            .log()
            .append(format!("Error copying files: {}: {}", name, reason));
    }
    if report.is_clean() {
        session
            .reporter()
            .notice(NoticeLevel::Success, &format!("Assets: {}", report));
    } else {
        session
            .reporter()
            .notice(NoticeLevel::Warning, &format!("Assets: {}", report));
    }
    Ok(report)
}

fn under_target(target: &Path, absolute: &str) -> PathBuf {
    target.join(absolute.trim_start_matches('/'))
}

/// Log and perform one copy, or only log it in dry-run.
fn copy_step(
    session: &mut Session,
    src: &Path,
    dest: &Path,
    copy: impl FnOnce(&Path, &Path) -> io::Result<()>,
) -> io::Result<()> {
    if session.is_dry_run() {
        session.log().append(format!(
            "DRY-RUN: skipped copy {} -> {}",
            src.display(),
            dest.display()
        ));
        return Ok(());
    }
    copy(src, dest)?;
    session
        .log()
        .append(format!("Copied {} -> {}", src.display(), dest.display()));
    Ok(())
}

/// Copy a single file and mark it executable, creating parent directories.
fn copy_executable(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest)?;
    fs::set_permissions(dest, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

/// Recursively copy `src` into `dest`, merging with existing directories.
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> io::Result<u64> {
    fs::create_dir_all(dest)?;
    let mut count = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let to = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            count += copy_tree(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to)?;
            count += 1;
        }
    }
    Ok(count)
}
