//! Installer configuration.
//!
//! Every literal the pipeline needs (tool names, the package set, locale and
//! branding values, asset names) lives in `InstallerConfig`. The defaults
//! reproduce the stock Quasar Linux install; a JSON file passed with
//! `--config` overrides any subset of fields.
//!
//! `validate()` restricts each value to the characters its use site allows,
//! so configuration values can be placed in command lines and in the chroot
//! script without further escaping concerns.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One `KEY="value"` line of `/etc/os-release`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsReleaseField {
    pub key: String,
    pub value: String,
}

impl OsReleaseField {
    fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Console font prepared on the live system before the first panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleFont {
    pub package: String,
    pub font: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    // Paths
    pub target_root: PathBuf,
    pub log_dir: PathBuf,
    /// Directory holding the assets copied into the target. Defaults to the
    /// directory of the installer executable.
    pub asset_dir: Option<PathBuf>,
    pub host_package_config: PathBuf,

    // Host tools
    pub partition_tool: String,
    pub chroot_tool: String,
    pub bootstrap_tool: String,
    pub fstab_tool: String,

    // Packages
    pub packages: Vec<String>,

    // Accounts
    pub wheel_group: String,
    pub supplementary_groups: Vec<String>,
    pub user_shell: String,

    // Locale & identity
    pub timezone: String,
    /// `locale.gen` lines
    pub locales: Vec<String>,
    pub lang: String,
    pub hostname: String,
    pub os_release: Vec<OsReleaseField>,

    // Bootloader
    pub bootloader_id: String,
    pub grub_distributor: String,

    // Services
    pub services: Vec<String>,
    pub service_source_dir: String,
    pub service_link_dir: String,

    // Assets
    pub branding_dir: String,
    pub branding_dest: String,
    pub follow_up_scripts: Vec<String>,
    pub first_login_script: String,
    pub post_install_marker: String,
    pub service_shim: String,
    pub service_shim_dest: String,

    pub console_font: Option<ConsoleFont>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            target_root: PathBuf::from(crate::install_state::DEFAULT_TARGET_ROOT),
            log_dir: PathBuf::from("/Quasar--installer"),
            asset_dir: None,
            host_package_config: PathBuf::from("/etc/pacman.conf"),

            partition_tool: "cfdisk".into(),
            chroot_tool: "artix-chroot".into(),
            bootstrap_tool: "basestrap".into(),
            fstab_tool: "fstabgen".into(),

            packages: strings(&[
                "base",
                "base-devel",
                "runit",
                "dbus-runit",
                "elogind-runit",
                "dhcpcd",
                "linux-zen",
                "plasma-nm",
                "linux-zen-headers",
                "dkms",
                "dbus",
                "sudo",
                "grub",
                "os-prober",
                "efibootmgr",
                "networkmanager-runit",
                "fish",
                "mc",
                "htop",
                "wget",
                "curl",
                "git",
                "iwd",
                "terminus-font",
            ]),

            wheel_group: "wheel".into(),
            supplementary_groups: strings(&[
                "audio", "video", "input", "storage", "optical", "lp", "scanner",
            ]),
            user_shell: "/bin/bash".into(),

            timezone: "Europe/Moscow".into(),
            locales: strings(&["en_US.UTF-8 UTF-8", "ru_RU.UTF-8 UTF-8"]),
            lang: "ru_RU.UTF-8".into(),
            hostname: "quasarlinux".into(),
            os_release: vec![
                OsReleaseField::new("NAME", "Quasar Linux"),
                OsReleaseField::new("PRETTY_NAME", "Quasar Linux (Artix base)"),
                OsReleaseField::new("ID", "quasar"),
                OsReleaseField::new("ID_LIKE", "artix"),
                OsReleaseField::new("ANACONDA_ID", "quasar"),
                OsReleaseField::new("VERSION", "1.0"),
                OsReleaseField::new("VERSION_ID", "1.0"),
                OsReleaseField::new("BUILD_ID", "rolling"),
                OsReleaseField::new("ANSI_COLOR", "0;36"),
                OsReleaseField::new("HOME_URL", "https://b-e-n-z1342.github.io"),
                OsReleaseField::new("LOGO", "quasar-logo"),
            ],

            bootloader_id: "GRUB".into(),
            grub_distributor: "Quasar Linux".into(),

            services: strings(&["dbus", "elogind", "acpid", "NetworkManager"]),
            service_source_dir: "/etc/runit/sv".into(),
            service_link_dir: "/etc/runit/runsvdir/default".into(),

            branding_dir: "pixmap".into(),
            branding_dest: "/usr/share/pixmap".into(),
            follow_up_scripts: strings(&["INSTALL.sh", "INST.sh"]),
            first_login_script: "INST.sh".into(),
            post_install_marker: ".Quasar_post_done".into(),
            service_shim: "systemctl".into(),
            service_shim_dest: "/usr/local/bin".into(),

            console_font: Some(ConsoleFont {
                package: "terminus-font".into(),
                font: "ter-v20n".into(),
            }),
        }
    }
}

fn is_word(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'))
}

fn is_file_name(value: &str) -> bool {
    is_word(value) && value != "." && value != ".."
}

fn is_safe_abs_path(value: &str) -> bool {
    value.starts_with('/')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '+' | '-'))
        && !value.split('/').any(|seg| seg == "..")
}

impl InstallerConfig {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize configuration to JSON")
    }

    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Directory assets are copied from.
    pub fn resolved_asset_dir(&self) -> PathBuf {
        if let Some(dir) = &self.asset_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.target_root.is_absolute() {
            bail!("Target root must be an absolute path");
        }
        if self.target_root == Path::new("/") {
            bail!("Target root cannot be /");
        }
        if !is_safe_abs_path(&self.target_root.to_string_lossy()) {
            bail!("Target root contains unsupported characters");
        }

        for (name, tool) in [
            ("partition_tool", &self.partition_tool),
            ("chroot_tool", &self.chroot_tool),
            ("bootstrap_tool", &self.bootstrap_tool),
            ("fstab_tool", &self.fstab_tool),
        ] {
            if !is_word(tool) {
                bail!("{} '{}' is not a valid program name", name, tool);
            }
        }

        if self.packages.is_empty() {
            bail!("At least one package must be listed");
        }
        if let Some(bad) = self.packages.iter().find(|p| !is_word(p)) {
            bail!("Invalid package name '{}'", bad);
        }

        if !is_word(&self.wheel_group) {
            bail!("Invalid wheel group '{}'", self.wheel_group);
        }
        if let Some(bad) = self.supplementary_groups.iter().find(|g| !is_word(g)) {
            bail!("Invalid group name '{}'", bad);
        }
        if !is_safe_abs_path(&self.user_shell) {
            bail!("User shell must be an absolute path");
        }

        let tz = &self.timezone;
        if !is_safe_abs_path(&format!("/{}", tz)) || tz.is_empty() || tz.starts_with('/') {
            bail!("Invalid timezone '{}'", tz);
        }
        if self.locales.is_empty() {
            bail!("At least one locale must be listed");
        }
        for locale in &self.locales {
            if locale.is_empty()
                || !locale
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-' | ' '))
            {
                bail!("Invalid locale line '{}'", locale);
            }
        }
        if self.lang.is_empty()
            || !self
                .lang
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-'))
        {
            bail!("Invalid LANG '{}'", self.lang);
        }

        // Hostname (1-63 chars, letters, digits and hyphens, no leading hyphen)
        let hostname = self.hostname.trim();
        if hostname.is_empty() || hostname.len() > 63 {
            bail!("Hostname must be 1-63 characters long");
        }
        if hostname.starts_with('-')
            || !hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            bail!("Hostname can only contain letters, numbers, and hyphens");
        }

        for field in &self.os_release {
            if field.key.is_empty()
                || !field
                    .key
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            {
                bail!("Invalid os-release key '{}'", field.key);
            }
            if field.value.contains(['\n', '\r']) {
                bail!("os-release value for {} must be a single line", field.key);
            }
        }

        if !self
            .bootloader_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
            || self.bootloader_id.is_empty()
        {
            bail!("Invalid bootloader id '{}'", self.bootloader_id);
        }
        if self.grub_distributor.is_empty()
            || !self
                .grub_distributor
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-' | '(' | ')'))
        {
            bail!("Invalid GRUB distributor '{}'", self.grub_distributor);
        }

        if let Some(bad) = self.services.iter().find(|s| !is_file_name(s)) {
            bail!("Invalid service name '{}'", bad);
        }
        for (name, dir) in [
            ("service_source_dir", &self.service_source_dir),
            ("service_link_dir", &self.service_link_dir),
            ("branding_dest", &self.branding_dest),
            ("service_shim_dest", &self.service_shim_dest),
        ] {
            if !is_safe_abs_path(dir) {
                bail!("{} must be a plain absolute path", name);
            }
        }

        for (name, file) in [
            ("branding_dir", &self.branding_dir),
            ("first_login_script", &self.first_login_script),
            ("post_install_marker", &self.post_install_marker),
            ("service_shim", &self.service_shim),
        ] {
            if !is_file_name(file) {
                bail!("{} '{}' must be a plain file name", name, file);
            }
        }
        if let Some(bad) = self.follow_up_scripts.iter().find(|s| !is_file_name(s)) {
            bail!("Invalid follow-up script name '{}'", bad);
        }

        if let Some(font) = &self.console_font {
            if !is_word(&font.package) || !is_word(&font.font) {
                bail!("Invalid console font settings");
            }
        }

        Ok(())
    }
}
