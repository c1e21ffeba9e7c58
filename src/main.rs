//! Quasar Linux installer - main entry point
//!
//! Parses the command line, loads configuration, opens the install log and
//! hands a terminal-backed `Session` to the installer.

use anyhow::Context;
use quasar_installer::cli::{Cli, Commands};
use quasar_installer::command_runner::{CommandRunner, HostShell};
use quasar_installer::config::InstallerConfig;
use quasar_installer::error::InstallerError;
use quasar_installer::hardware::detect_boot_mode;
use quasar_installer::install_log::InstallLog;
use quasar_installer::installer::Installer;
use quasar_installer::reporter::{render_panel, TerminalReporter, PANEL_WIDTH};
use quasar_installer::session::Session;
use quasar_installer::{process_guard, sanity};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize diagnostics on stderr. `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main application entry point
fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    debug!("CLI arguments parsed: {:?}", cli);

    match cli.command {
        Some(Commands::Validate { ref file }) => validate_config(file),
        Some(Commands::PrintConfig) => print_config(&cli),
        Some(Commands::Install) | None => run_install(&cli),
    }
}

fn validate_config(path: &std::path::Path) -> ExitCode {
    info!("Validating configuration file: {:?}", path);
    match InstallerConfig::load_from_file(path).and_then(|c| c.validate()) {
        Ok(()) => {
            println!("Configuration file is valid: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("Configuration validation failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_config(cli: &Cli) -> ExitCode {
    match effective_config(cli).and_then(|c| c.to_json()) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Configuration file (or defaults) with command-line overrides applied.
fn effective_config(cli: &Cli) -> anyhow::Result<InstallerConfig> {
    let mut config = match &cli.config {
        Some(path) => InstallerConfig::load_from_file(path)?,
        None => InstallerConfig::default(),
    };
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    if let Some(target) = &cli.target {
        config.target_root = target.clone();
    }
    if let Some(assets) = &cli.asset_dir {
        config.asset_dir = Some(assets.clone());
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run_install(cli: &Cli) -> ExitCode {
    let config = match effective_config(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let log = match InstallLog::initialize(&config.log_dir) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    if let Err(e) = process_guard::init_signal_handlers(log.path().to_path_buf()) {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    if !sanity::is_running_as_root() {
        log.append("Installer started without root privileges");
        let err = InstallerError::NotRoot;
        eprintln!(
            "{}",
            render_panel(
                "ERROR",
                &[
                    err.to_string(),
                    "Run the installer as root: sudo quasar-installer".to_string(),
                ],
                None,
                PANEL_WIDTH,
            )
        );
        return ExitCode::from(err.exit_code());
    }
    log.append("Installer started with root privileges");
    if cli.dry_run {
        log.append("Dry-run mode: destructive commands will be skipped");
    }

    let check = sanity::verify_environment(&config);
    let boot_mode = detect_boot_mode();
    let runner = CommandRunner::new(Box::new(HostShell::new()), cli.dry_run);
    let mut session = Session::new(log, Box::new(TerminalReporter::new()), runner);

    if !check.missing_binaries.is_empty() {
        session.log().append(format!(
            "Missing programs: {}",
            check.missing_binaries.join(", ")
        ));
        let lines: Vec<String> = check
            .missing_binaries
            .iter()
            .map(|b| format!("- {}", b))
            .collect();
        session
            .reporter()
            .show_panel("WARNING: MISSING PROGRAMS", &lines, Some("The installation may fail"));
    }

    let installer = Installer::new(config);
    let mut ctx = installer.new_context(boot_mode);
    match installer.run(&mut session, &mut ctx) {
        Ok(()) => {
            info!("Installation completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Installation failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
