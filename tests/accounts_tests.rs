//! Account provisioning tests: username prompting and password confirmation.

mod common;

use common::{lines, Fixture, RecordingShell, ScriptedReporter};
use quasar_installer::logic::accounts::{create_user, prompt_username, set_password, Account};
use quasar_installer::reporter::NoticeLevel;
use quasar_installer::types::Username;

#[test]
fn test_password_mismatch_retries_then_sets_once() {
    let fx = Fixture::new();
    let (reporter, transcript) =
        ScriptedReporter::new(&[], &["hunter2", "hunter3", "hunter2", "hunter2"]);
    let (shell, calls) = RecordingShell::new();
    let mut session = fx.session(reporter, shell, false);
    let alice: Username = "alice".parse().unwrap();

    set_password(&mut session, "artix-chroot", &fx.target(), Account::User(&alice)).unwrap();

    let recorded = calls.borrow();
    let chpasswd: Vec<_> = recorded.iter().filter(|c| c.line.ends_with("chpasswd")).collect();
    assert_eq!(chpasswd.len(), 1);
    assert_eq!(chpasswd[0].stdin.as_deref(), Some("alice:hunter2\n"));

    let errors = transcript.borrow().notices_at(NoticeLevel::Error).len();
    assert_eq!(errors, 1);

    let log = fx.log_contents();
    assert!(log.contains("Password set for alice"));
    assert!(!log.contains("hunter"));
}

#[test]
fn test_empty_password_is_rejected() {
    let fx = Fixture::new();
    let (reporter, transcript) = ScriptedReporter::new(&[], &["", "", "toor", "toor"]);
    let (shell, calls) = RecordingShell::new();
    let mut session = fx.session(reporter, shell, false);

    set_password(&mut session, "artix-chroot", &fx.target(), Account::Root).unwrap();

    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(calls.borrow()[0].stdin.as_deref(), Some("root:toor\n"));
    let notices = transcript.borrow();
    assert!(notices
        .notices_at(NoticeLevel::Error)
        .iter()
        .any(|m| m.contains("cannot be empty")));
}

#[test]
fn test_chpasswd_failure_is_fatal() {
    let fx = Fixture::new();
    let (reporter, _) = ScriptedReporter::new(&[], &["pw", "pw"]);
    let (shell, _calls) = RecordingShell::new();
    let shell = shell.fail("chpasswd", 1, "chpasswd: line 1: user 'root' does not exist");
    let mut session = fx.session(reporter, shell, false);

    let err = set_password(&mut session, "artix-chroot", &fx.target(), Account::Root).unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(!fx.log_contents().contains("Password set for root"));
}

#[test]
fn test_username_reprompts_until_valid() {
    let fx = Fixture::new();
    let (reporter, transcript) = ScriptedReporter::new(&["Alice", "", "alice"], &[]);
    let (shell, _) = RecordingShell::new();
    let mut session = fx.session(reporter, shell, false);

    let name = prompt_username(&mut session).unwrap();
    assert_eq!(name.as_str(), "alice");
    assert_eq!(transcript.borrow().notices_at(NoticeLevel::Error).len(), 2);
    assert!(fx.log_contents().contains("Creating user: alice"));
}

#[test]
fn test_group_failure_is_tolerated() {
    let fx = Fixture::new();
    let (reporter, transcript) = ScriptedReporter::new(&[], &[]);
    let (shell, calls) = RecordingShell::new();
    let shell = shell.fail("usermod", 6, "usermod: group 'storage' does not exist");
    let mut session = fx.session(reporter, shell, false);
    let alice: Username = "alice".parse().unwrap();

    create_user(&mut session, &fx.config(), &fx.target(), &alice).unwrap();

    let commands = lines(&calls);
    assert!(commands[0].contains("useradd -m -G wheel -s /bin/bash alice"));
    assert!(commands[1].contains("usermod -aG"));
    assert_eq!(transcript.borrow().notices_at(NoticeLevel::Warning).len(), 1);
}
