//! Shared fakes for integration tests
//!
//! - `ScriptedReporter`: answers prompts from a queue and records everything
//!   shown to the operator
//! - `RecordingShell`: answers commands from substring rules and records
//!   every line it was asked to run
//! - `Fixture`: temp log dir, target root, asset dir and fake `/dev` +
//!   `/sys/block` tree

#![allow(dead_code)]

use quasar_installer::command_runner::{CommandResult, CommandRunner, Invocation, Shell};
use quasar_installer::config::InstallerConfig;
use quasar_installer::disk::DeviceProbe;
use quasar_installer::error::{InstallerError, Result};
use quasar_installer::install_log::InstallLog;
use quasar_installer::reporter::{NoticeLevel, Reporter};
use quasar_installer::session::Session;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;
use zeroize::Zeroizing;

// =============================================================================
// Reporter fake
// =============================================================================

/// Everything the pipeline showed or asked.
#[derive(Debug, Default)]
pub struct Transcript {
    pub panels: Vec<(String, Vec<String>)>,
    pub notices: Vec<(NoticeLevel, String)>,
    pub prompts: Vec<String>,
    pub output: Vec<String>,
    pub progress: Vec<(String, usize, usize)>,
    pub pauses: usize,
}

impl Transcript {
    pub fn panel_titles(&self) -> Vec<&str> {
        self.panels.iter().map(|(t, _)| t.as_str()).collect()
    }

    pub fn has_panel(&self, title: &str) -> bool {
        self.panels.iter().any(|(t, _)| t == title)
    }

    pub fn notices_at(&self, level: NoticeLevel) -> Vec<&str> {
        self.notices
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }
}

pub struct ScriptedReporter {
    inputs: VecDeque<String>,
    secrets: VecDeque<String>,
    transcript: Rc<RefCell<Transcript>>,
}

impl ScriptedReporter {
    pub fn new(inputs: &[&str], secrets: &[&str]) -> (Self, Rc<RefCell<Transcript>>) {
        let transcript = Rc::new(RefCell::new(Transcript::default()));
        let reporter = Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            secrets: secrets.iter().map(|s| s.to_string()).collect(),
            transcript: Rc::clone(&transcript),
        };
        (reporter, transcript)
    }
}

impl Reporter for ScriptedReporter {
    fn show_panel(&mut self, title: &str, lines: &[String], _footer: Option<&str>) {
        self.transcript
            .borrow_mut()
            .panels
            .push((title.to_string(), lines.to_vec()));
    }

    fn show_progress(&mut self, description: &str, current: usize, total: usize) {
        self.transcript
            .borrow_mut()
            .progress
            .push((description.to_string(), current, total));
    }

    fn show_output(&mut self, line: &str) {
        self.transcript.borrow_mut().output.push(line.to_string());
    }

    fn notice(&mut self, level: NoticeLevel, message: &str) {
        self.transcript
            .borrow_mut()
            .notices
            .push((level, message.to_string()));
    }

    fn prompt(&mut self, text: &str) -> Result<String> {
        self.transcript.borrow_mut().prompts.push(text.to_string());
        self.inputs.pop_front().ok_or(InstallerError::InputClosed)
    }

    fn prompt_secret(&mut self, text: &str) -> Result<Zeroizing<String>> {
        self.transcript.borrow_mut().prompts.push(text.to_string());
        self.secrets
            .pop_front()
            .map(Zeroizing::new)
            .ok_or(InstallerError::InputClosed)
    }

    fn pause(&mut self, _text: &str) -> Result<()> {
        self.transcript.borrow_mut().pauses += 1;
        Ok(())
    }
}

// =============================================================================
// Shell fake
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Capture,
    Stream,
    Interactive,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub line: String,
    pub stdin: Option<String>,
    pub mode: Mode,
}

/// Answers each command with the first rule whose pattern is a substring of
/// the command line; unmatched commands succeed with no output.
pub struct RecordingShell {
    rules: Vec<(String, CommandResult)>,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl RecordingShell {
    pub fn new() -> (Self, Rc<RefCell<Vec<Call>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let shell = Self {
            rules: Vec::new(),
            calls: Rc::clone(&calls),
        };
        (shell, calls)
    }

    pub fn respond(mut self, pattern: &str, stdout: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            CommandResult {
                exit_code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
        self
    }

    pub fn fail(mut self, pattern: &str, code: i32, stderr: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            CommandResult {
                exit_code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    fn answer(&self, invocation: &Invocation, mode: Mode) -> CommandResult {
        self.calls.borrow_mut().push(Call {
            line: invocation.line().to_string(),
            stdin: invocation.secret_stdin().map(str::to_string),
            mode,
        });
        self.rules
            .iter()
            .find(|(pattern, _)| invocation.line().contains(pattern.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or(CommandResult {
                exit_code: Some(0),
                ..CommandResult::default()
            })
    }
}

impl Shell for RecordingShell {
    fn capture(&mut self, invocation: &Invocation) -> io::Result<CommandResult> {
        Ok(self.answer(invocation, Mode::Capture))
    }

    fn stream(
        &mut self,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> io::Result<CommandResult> {
        let result = self.answer(invocation, Mode::Stream);
        for line in result.stdout.lines() {
            on_line(line);
        }
        Ok(result)
    }

    fn interactive(&mut self, invocation: &Invocation) -> io::Result<Option<i32>> {
        Ok(self.answer(invocation, Mode::Interactive).exit_code)
    }
}

pub fn lines(calls: &Rc<RefCell<Vec<Call>>>) -> Vec<String> {
    calls.borrow().iter().map(|c| c.line.clone()).collect()
}

/// Index of the first recorded command containing `needle`.
pub fn position(calls: &Rc<RefCell<Vec<Call>>>, needle: &str) -> Option<usize> {
    calls.borrow().iter().position(|c| c.line.contains(needle))
}

// =============================================================================
// Filesystem fixture
// =============================================================================

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        for sub in ["log", "mnt", "assets", "dev", "sys/block"] {
            fs::create_dir_all(dir.path().join(sub)).expect("fixture dir");
        }
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn log_dir(&self) -> PathBuf {
        self.path().join("log")
    }

    pub fn target(&self) -> PathBuf {
        self.path().join("mnt")
    }

    pub fn assets(&self) -> PathBuf {
        self.path().join("assets")
    }

    /// Add a disk node, its rotational flag and nodes for partitions 1
    /// and 2.
    pub fn add_disk(&self, name: &str, rotational: bool) {
        fs::write(self.path().join("dev").join(name), "").expect("device node");
        let sep = if name.ends_with(|c: char| c.is_ascii_digit()) { "p" } else { "" };
        for n in 1..=2 {
            fs::write(self.path().join("dev").join(format!("{}{}{}", name, sep, n)), "")
                .expect("partition node");
        }
        let queue = self.path().join("sys/block").join(name).join("queue");
        fs::create_dir_all(&queue).expect("sysfs queue");
        fs::write(queue.join("rotational"), if rotational { "1\n" } else { "0\n" })
            .expect("rotational flag");
    }

    pub fn add_asset(&self, relative: &str, contents: &str) {
        let path = self.assets().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("asset dir");
        }
        fs::write(path, contents).expect("asset");
    }

    pub fn probe(&self) -> DeviceProbe {
        DeviceProbe::with_roots(self.path(), self.path().join("sys/block"))
    }

    pub fn config(&self) -> InstallerConfig {
        InstallerConfig {
            target_root: self.target(),
            log_dir: self.log_dir(),
            asset_dir: Some(self.assets()),
            ..InstallerConfig::default()
        }
    }

    pub fn log_contents(&self) -> String {
        fs::read_to_string(self.log_dir().join("install.log")).unwrap_or_default()
    }

    pub fn session(&self, reporter: ScriptedReporter, shell: RecordingShell, dry_run: bool) -> Session {
        let log = InstallLog::initialize(&self.log_dir()).expect("install log");
        Session::new(log, Box::new(reporter), CommandRunner::new(Box::new(shell), dry_run))
    }
}
