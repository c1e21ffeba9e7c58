//! Installer module
//!
//! Drives the stage sequence over a `Session` and an `InstallationContext`.
//! Every stage entry goes through `InstallationContext::transition_to`, so a
//! stage can only run once its predecessor has completed and its inputs are
//! recorded. The first fatal error marks the context failed, is written to
//! the install log and is returned to the caller.

use crate::config::InstallerConfig;
use crate::disk::{list_disks, select_disk, DeviceProbe};
use crate::engine::storage::calculate_storage_plan;
use crate::error::Result;
use crate::install_state::{InstallStage, InstallationContext};
use crate::logic::accounts::{create_user, prompt_username, set_password, Account};
use crate::logic::base_system::{
    copy_assets, copy_host_package_config, generate_fstab, install_packages,
};
use crate::logic::chroot::configure_chroot;
use crate::logic::postinstall::{show_summary, unmount_target};
use crate::logic::preinstall::{announce_boot_mode, prepare_console};
use crate::logic::storage::{assign_partitions, format_partitions, mount_partitions, partition_disk};
use crate::session::Session;

/// Installer instance
pub struct Installer {
    config: InstallerConfig,
    probe: DeviceProbe,
}

impl Installer {
    pub fn new(config: InstallerConfig) -> Self {
        Self::with_probe(config, DeviceProbe::default())
    }

    /// Installer that resolves device nodes and sysfs attributes through
    /// `probe` instead of the live system.
    pub fn with_probe(config: InstallerConfig, probe: DeviceProbe) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Context for a fresh run of this installer.
    pub fn new_context(&self, boot_mode: crate::types::BootMode) -> InstallationContext {
        InstallationContext::new(
            boot_mode,
            self.config.target_root.clone(),
            self.config.packages.clone(),
        )
    }

    /// Run every stage to completion.
    ///
    /// On failure the context is left in `Failed`, `FATAL: <error>` is
    /// logged and an error panel is shown before the error is returned.
    pub fn run(&self, session: &mut Session, ctx: &mut InstallationContext) -> Result<()> {
        session.log().append(format!(
            "Installation started (boot mode {}, target {})",
            ctx.boot_mode(),
            ctx.target_root().display()
        ));

        match self.run_stages(session, ctx) {
            Ok(()) => Ok(()),
            Err(err) => {
                let stage = ctx.current_stage();
                session.log().append(format!("FATAL: {}", err));
                if let Err(e) = ctx.fail() {
                    tracing::warn!("Could not mark installation failed: {}", e);
                }
                let log_path = session.log().path().display().to_string();
                session.reporter().show_panel(
                    "INSTALLATION FAILED",
                    &[
                        err.to_string(),
                        String::new(),
                        format!("Stage: {}", stage),
                        format!("Log file: {}", log_path),
                    ],
                    None,
                );
                Err(err)
            }
        }
    }

    fn run_stages(&self, session: &mut Session, ctx: &mut InstallationContext) -> Result<()> {
        let config = &self.config;

        let font = prepare_console(session, config.console_font.as_ref())?;
        session.log().append(font.to_string());
        announce_boot_mode(session, ctx.boot_mode())?;

        enter(session, ctx, InstallStage::SelectingDisk)?;
        let disks = list_disks(session, &self.probe)?;
        let disk = select_disk(session, &self.probe, &disks)?;
        ctx.set_selected_disk(disk)?;

        enter(session, ctx, InstallStage::PartitioningDisk)?;
        let disk = ctx.require_disk()?.clone();
        let table = partition_disk(session, &config.partition_tool, &disk)?;
        let partitions = assign_partitions(session, &self.probe, &disk, &table)?;
        ctx.set_partitions(partitions)?;

        enter(session, ctx, InstallStage::FormattingPartitions)?;
        let plan = calculate_storage_plan(ctx.boot_mode(), ctx.require_partitions()?, ctx.target_root())?;
        session.log().append(plan.summary());
        format_partitions(session, &plan)?;

        enter(session, ctx, InstallStage::MountingPartitions)?;
        mount_partitions(session, &plan)?;
        let username = prompt_username(session)?;
        ctx.set_username(username)?;

        enter(session, ctx, InstallStage::InstallingBaseSystem)?;
        let target = ctx.target_root().to_path_buf();
        install_packages(session, config, &target, ctx.packages())?;
        generate_fstab(session, config, &target)?;
        copy_host_package_config(session, config, &target)?;

        enter(session, ctx, InstallStage::ProvisioningAccounts)?;
        let username = ctx.require_username()?.clone();
        create_user(session, config, &target, &username)?;
        set_password(session, &config.chroot_tool, &target, Account::User(&username))?;
        set_password(session, &config.chroot_tool, &target, Account::Root)?;

        enter(session, ctx, InstallStage::CopyingAssets)?;
        let report = copy_assets(session, config, &target, &username)?;
        session.log().append(format!("Assets: {}", report));

        enter(session, ctx, InstallStage::ConfiguringChroot)?;
        configure_chroot(session, config, ctx)?;

        enter(session, ctx, InstallStage::Finalizing)?;
        show_summary(session, &username, &config.first_login_script)?;
        unmount_target(session, &target)?;

        enter(session, ctx, InstallStage::Completed)?;
        Ok(())
    }
}

fn enter(session: &mut Session, ctx: &mut InstallationContext, stage: InstallStage) -> Result<()> {
    ctx.transition_to(stage)?;
    session.log().append(format!("Stage: {}", stage));
    session.reporter().show_progress(
        stage.description(),
        stage.order() as usize,
        InstallStage::Completed.order() as usize,
    );
    Ok(())
}
