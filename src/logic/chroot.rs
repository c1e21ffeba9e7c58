//! In-target configuration stage.
//!
//! Renders the second-stage script, writes it into the target root, runs it
//! through the chroot tool and removes it again whatever the outcome.

use crate::command_runner::{FailPolicy, Progress};
use crate::config::InstallerConfig;
use crate::error::{InstallerError, Result};
use crate::install_state::InstallationContext;
use crate::reporter::NoticeLevel;
use crate::scripts::chroot::{failure_reason, ChrootScript, SCRIPT_PATH};
use crate::scripts::system::ChrootRunArgs;
use crate::session::Session;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Resolve the script parameters from configuration and recorded choices.
pub fn build_script(config: &InstallerConfig, ctx: &InstallationContext) -> Result<ChrootScript> {
    Ok(ChrootScript {
        boot_mode: ctx.boot_mode(),
        disk: ctx.require_disk()?.clone(),
        timezone: config.timezone.clone(),
        locales: config.locales.clone(),
        lang: config.lang.clone(),
        hostname: config.hostname.clone(),
        os_release: config
            .os_release
            .iter()
            .map(|f| (f.key.clone(), f.value.clone()))
            .collect(),
        bootloader_id: config.bootloader_id.clone(),
        grub_distributor: config.grub_distributor.clone(),
        services: config.services.clone(),
        service_source_dir: config.service_source_dir.clone(),
        service_link_dir: config.service_link_dir.clone(),
        username: ctx.require_username()?.clone(),
        follow_up_script: config.first_login_script.clone(),
        post_install_marker: config.post_install_marker.clone(),
    })
}

/// Host path of the script for a given target root.
pub fn script_host_path(target: &Path) -> PathBuf {
    target.join(SCRIPT_PATH.trim_start_matches('/'))
}

/// Write, run and remove the configuration script.
///
/// A non-zero script exit becomes `InstallerError::ChrootScript` carrying
/// the step that failed.
pub fn configure_chroot(
    session: &mut Session,
    config: &InstallerConfig,
    ctx: &InstallationContext,
) -> Result<()> {
    let script = build_script(config, ctx)?;
    let host_path = script_host_path(ctx.target_root());

    session.reporter().show_panel(
        "SYSTEM CONFIGURATION",
        &[
            format!("Timezone: {}", script.timezone),
            format!("Hostname: {}", script.hostname),
            format!("Bootloader: GRUB ({})", script.boot_mode),
            format!("Services: {}", script.services.join(", ")),
        ],
        Some("Configuring the installed system..."),
    );

    if session.is_dry_run() {
        session.log().append(format!(
            "DRY-RUN: skipped writing {}",
            host_path.display()
        ));
    } else {
        fs::write(&host_path, script.render())?;
        fs::set_permissions(&host_path, fs::Permissions::from_mode(0o755))?;
        session
            .log()
            .append(format!("Wrote {}", host_path.display()));
    }

    let run = ChrootRunArgs {
        tool: config.chroot_tool.clone(),
        target: ctx.target_root().to_path_buf(),
        program: SCRIPT_PATH.to_string(),
    };
    let outcome = session.execute_args(&run, FailPolicy::FailFast, Progress::Stream);

    if !session.is_dry_run() {
        if let Err(e) = fs::remove_file(&host_path) {
            session.log().append(format!(
                "Warning: could not remove {}: {}",
                host_path.display(),
                e
            ));
        }
    }

    match outcome {
        Ok(_) => {
            session.log().append("Chroot setup completed");
            session
                .reporter()
                .notice(NoticeLevel::Success, "System configuration complete");
            Ok(())
        }
        Err(InstallerError::CommandFailed { code, .. }) => {
            let reason = failure_reason(code);
            session
                .log()
                .append(format!("Chroot setup failed ({}): {}", code, reason));
            Err(InstallerError::ChrootScript {
                code,
                reason: reason.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_host_path() {
        assert_eq!(
            script_host_path(Path::new("/mnt")),
            PathBuf::from("/mnt/chroot_setup.sh")
        );
    }
}
