//! Second-stage configuration script, executed inside the target root.
//!
//! The script is rendered from a `ChrootScript` value, so every interpolated
//! value is either a validated type or passed through `shell_quote`. Each
//! step that must not be skipped checks its own result and exits with a
//! distinct status:
//!
//! | Exit | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 2    | `grub-install` failed                           |
//! | 3    | EFI loader missing after `grub-install` (UEFI)  |
//! | 4    | `grub.cfg` was not generated or is empty        |
//! | 5    | locale generation failed                        |
//!
//! Runit services are only linked after the bootloader is verified, so a
//! failed bootloader step never leaves activated services behind.

use crate::types::{shell_quote, BootMode, DevicePath, Username};
use std::fmt::Write as _;

/// Script path inside the target root.
pub const SCRIPT_PATH: &str = "/chroot_setup.sh";

const GRUB_CFG: &str = "/boot/grub/grub.cfg";

/// Everything the script needs, resolved before rendering.
#[derive(Debug, Clone)]
pub struct ChrootScript {
    pub boot_mode: BootMode,
    /// Disk that receives the BIOS boot code.
    pub disk: DevicePath,
    pub timezone: String,
    /// `locale.gen` lines, e.g. `en_US.UTF-8 UTF-8`.
    pub locales: Vec<String>,
    pub lang: String,
    pub hostname: String,
    /// `/etc/os-release` key/value pairs in output order.
    pub os_release: Vec<(String, String)>,
    pub bootloader_id: String,
    pub grub_distributor: String,
    pub services: Vec<String>,
    /// Runit service definitions (`/etc/runit/sv`).
    pub service_source_dir: String,
    /// Runlevel directory the services are linked into.
    pub service_link_dir: String,
    pub username: Username,
    /// Follow-up script in the user's home, run on first login.
    pub follow_up_script: String,
    /// Marker file in the user's home that disables the first-login hook.
    pub post_install_marker: String,
}

impl ChrootScript {
    /// Path of the EFI loader `grub-install` is expected to produce.
    pub fn efi_loader_path(&self) -> String {
        format!("/boot/efi/EFI/{}/grubx64.efi", self.bootloader_id)
    }

    pub fn render(&self) -> String {
        let mut s = String::new();
        s.push_str("#!/bin/bash\n");
        s.push_str("fail() { echo \"chroot_setup: $2\" >&2; exit \"$1\"; }\n");
        s.push_str("warn() { echo \"chroot_setup: warning: $1\" >&2; }\n\n");

        self.render_clock(&mut s);
        self.render_locale(&mut s);
        self.render_network_identity(&mut s);
        self.render_os_release(&mut s);
        self.render_bootloader(&mut s);
        self.render_services(&mut s);
        self.render_first_login_hook(&mut s);
        s
    }

    fn render_clock(&self, s: &mut String) {
        let zone = shell_quote(&format!("/usr/share/zoneinfo/{}", self.timezone));
        let _ = writeln!(s, "# clock");
        let _ = writeln!(s, "ln -sf {} /etc/localtime || warn \"timezone link failed\"", zone);
        let _ = writeln!(s, "hwclock --systohc || warn \"hwclock failed\"\n");
    }

    fn render_locale(&self, s: &mut String) {
        let _ = writeln!(s, "# locale");
        for locale in &self.locales {
            let _ = writeln!(s, "echo {} >> /etc/locale.gen", shell_quote(locale));
        }
        let _ = writeln!(s, "locale-gen || fail 5 \"locale generation failed\"");
        let _ = writeln!(
            s,
            "echo {} > /etc/locale.conf\n",
            shell_quote(&format!("LANG={}", self.lang))
        );
    }

    fn render_network_identity(&self, s: &mut String) {
        let host = &self.hostname;
        let _ = writeln!(s, "# hostname");
        let _ = writeln!(s, "echo {} > /etc/hostname", shell_quote(host));
        let _ = writeln!(s, "cat > /etc/hosts <<'EOF'");
        let _ = writeln!(s, "127.0.0.1 localhost");
        let _ = writeln!(s, "::1 localhost");
        let _ = writeln!(s, "127.0.1.1 {host}.localdomain {host}");
        let _ = writeln!(s, "EOF\n");
    }

    fn render_os_release(&self, s: &mut String) {
        let _ = writeln!(s, "# branding");
        let _ = writeln!(s, "cat > /etc/os-release <<'EOF'");
        for (key, value) in &self.os_release {
            let _ = writeln!(s, "{}=\"{}\"", key, os_release_escape(value));
        }
        let _ = writeln!(s, "EOF\n");
    }

    fn render_bootloader(&self, s: &mut String) {
        let _ = writeln!(s, "# bootloader");
        match self.boot_mode {
            BootMode::Uefi => {
                let _ = writeln!(
                    s,
                    "grub-install --target=x86_64-efi --efi-directory=/boot/efi --bootloader-id={} --recheck || fail 2 \"grub-install failed\"",
                    shell_quote(&self.bootloader_id)
                );
                let loader = self.efi_loader_path();
                let _ = writeln!(
                    s,
                    "[ -f {0} ] || fail 3 \"EFI loader {1} missing\"",
                    shell_quote(&loader),
                    loader
                );
            }
            BootMode::Bios => {
                let _ = writeln!(
                    s,
                    "grub-install --target=i386-pc {} --recheck || fail 2 \"grub-install failed\"",
                    self.disk
                );
            }
        }

        let expr = format!(
            "s/^GRUB_DISTRIBUTOR=.*/GRUB_DISTRIBUTOR=\"{}\"/",
            sed_escape(&self.grub_distributor)
        );
        let _ = writeln!(s, "if [ -f /etc/default/grub ]; then");
        let _ = writeln!(s, "    sed -i {} /etc/default/grub", shell_quote(&expr));
        let _ = writeln!(s, "fi");
        let _ = writeln!(s, "grub-mkconfig -o {GRUB_CFG} || fail 4 \"grub-mkconfig failed\"");
        let _ = writeln!(s, "[ -s {GRUB_CFG} ] || fail 4 \"{GRUB_CFG} missing or empty\"\n");
    }

    fn render_services(&self, s: &mut String) {
        let services: Vec<String> = self.services.iter().map(|svc| shell_quote(svc)).collect();
        let src = shell_quote(&self.service_source_dir);
        let dst = shell_quote(&self.service_link_dir);
        let _ = writeln!(s, "# services");
        let _ = writeln!(s, "mkdir -p {}", dst);
        let _ = writeln!(s, "for svc in {}; do", services.join(" "));
        let _ = writeln!(s, "    if [ -d {}/\"$svc\" ]; then", src);
        let _ = writeln!(s, "        ln -sf {}/\"$svc\" {}/", src, dst);
        let _ = writeln!(s, "    else");
        let _ = writeln!(s, "        warn \"service $svc not installed, skipping\"");
        let _ = writeln!(s, "    fi");
        let _ = writeln!(s, "done\n");
    }

    fn render_first_login_hook(&self, s: &mut String) {
        let user = &self.username;
        let bashrc = format!("/home/{}/.bashrc", user);
        let _ = writeln!(s, "# first-login hook");
        let _ = writeln!(s, "cat >> {} <<'EOF'", bashrc);
        let _ = writeln!(s, "if [ ! -f ~/{} ]; then", self.post_install_marker);
        let _ = writeln!(s, "    touch ~/{}", self.post_install_marker);
        let _ = writeln!(s, "    ~/{}", self.follow_up_script);
        let _ = writeln!(s, "fi");
        let _ = writeln!(s, "EOF");
        let _ = writeln!(s, "chown {0}:{0} {1}", user, bashrc);
    }
}

/// Human-readable reason for a script exit status.
pub fn failure_reason(code: i32) -> &'static str {
    match code {
        2 => "bootloader installation failed",
        3 => "EFI loader missing after grub-install",
        4 => "GRUB configuration missing or empty",
        5 => "locale generation failed",
        _ => "chroot configuration script failed",
    }
}

/// Escape a value for a double-quoted os-release assignment.
fn os_release_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a sed replacement that uses `/` as the delimiter.
fn sed_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '/' | '&' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(boot_mode: BootMode) -> ChrootScript {
        ChrootScript {
            boot_mode,
            disk: "/dev/sda".parse().expect("valid disk"),
            timezone: "Europe/Moscow".into(),
            locales: vec!["en_US.UTF-8 UTF-8".into(), "ru_RU.UTF-8 UTF-8".into()],
            lang: "ru_RU.UTF-8".into(),
            hostname: "quasarlinux".into(),
            os_release: vec![
                ("NAME".into(), "Quasar Linux".into()),
                ("ID".into(), "quasar".into()),
            ],
            bootloader_id: "GRUB".into(),
            grub_distributor: "Quasar Linux".into(),
            services: vec!["dbus".into(), "NetworkManager".into()],
            service_source_dir: "/etc/runit/sv".into(),
            service_link_dir: "/etc/runit/runsvdir/default".into(),
            username: "alice".parse().expect("valid username"),
            follow_up_script: "INST.sh".into(),
            post_install_marker: ".Quasar_post_done".into(),
        }
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("missing `{}` in script:\n{}", needle, haystack))
    }

    #[test]
    fn test_uefi_script_verifies_loader() {
        let text = script(BootMode::Uefi).render();
        assert!(text.starts_with("#!/bin/bash\n"));
        assert!(text.contains(
            "grub-install --target=x86_64-efi --efi-directory=/boot/efi --bootloader-id=GRUB --recheck || fail 2"
        ));
        assert!(text.contains("[ -f /boot/efi/EFI/GRUB/grubx64.efi ] || fail 3"));
        assert!(!text.contains("i386-pc"));
    }

    #[test]
    fn test_bios_script_targets_disk() {
        let text = script(BootMode::Bios).render();
        assert!(text.contains("grub-install --target=i386-pc /dev/sda --recheck || fail 2"));
        assert!(!text.contains("grubx64.efi"));
    }

    #[test]
    fn test_steps_are_ordered() {
        let text = script(BootMode::Uefi).render();
        let steps = [
            "/etc/localtime",
            "locale-gen",
            "/etc/hostname",
            "/etc/os-release",
            "grub-install",
            "grub-mkconfig",
            "[ -s /boot/grub/grub.cfg ] || fail 4",
            "ln -sf /etc/runit/sv/\"$svc\"",
            ".bashrc",
        ];
        let positions: Vec<usize> = steps.iter().map(|s| position(&text, s)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);
    }

    #[test]
    fn test_locale_and_branding_values() {
        let text = script(BootMode::Uefi).render();
        assert!(text.contains("echo 'en_US.UTF-8 UTF-8' >> /etc/locale.gen"));
        assert!(text.contains("echo LANG=ru_RU.UTF-8 > /etc/locale.conf"));
        assert!(text.contains("127.0.1.1 quasarlinux.localdomain quasarlinux"));
        assert!(text.contains("NAME=\"Quasar Linux\"\n"));
        assert!(text.contains("ID=\"quasar\"\n"));
        assert!(text.contains("'s/^GRUB_DISTRIBUTOR=.*/GRUB_DISTRIBUTOR=\"Quasar Linux\"/'"));
    }

    #[test]
    fn test_first_login_hook_is_guarded() {
        let text = script(BootMode::Bios).render();
        assert!(text.contains("cat >> /home/alice/.bashrc <<'EOF'"));
        assert!(text.contains("if [ ! -f ~/.Quasar_post_done ]; then"));
        let touch = position(&text, "    touch ~/.Quasar_post_done");
        let run = position(&text, "    ~/INST.sh");
        assert!(touch < run);
    }

    #[test]
    fn test_missing_services_are_skipped() {
        let text = script(BootMode::Uefi).render();
        assert!(text.contains("for svc in dbus NetworkManager; do"));
        assert!(text.contains("not installed, skipping"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(os_release_escape("a\"b$c"), "a\\\"b\\$c");
        assert_eq!(sed_escape("A/B & C"), "A\\/B \\& C");
        assert_eq!(failure_reason(3), "EFI loader missing after grub-install");
        assert_eq!(failure_reason(42), "chroot configuration script failed");
    }
}
