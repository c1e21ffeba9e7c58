//! Command execution
//!
//! This module is the only place the installer starts host tools.
//!
//! - `Shell` is the seam between the pipeline and the operating system.
//!   `HostShell` runs lines through `sh -c`; tests substitute a recorder.
//! - `CommandRunner` applies the execution policy on top of a `Shell`:
//!   logging, fail-fast vs. continue, progress streaming and dry-run.
//!
//! # Failure Policy
//!
//! On a non-zero exit with `FailPolicy::FailFast` the failure is logged with
//! its command, exit code and error text, summarized to the operator, and
//! returned as `InstallerError::CommandFailed`. The driver propagates it and
//! the process exits with that code. With `FailPolicy::Continue` the failure
//! is logged and reported and `Ok(None)` is returned so the caller can carry
//! on.

use crate::error::{InstallerError, Result};
use crate::install_log::InstallLog;
use crate::process_guard::{CommandProcessGroup, RegisteredChild};
use crate::reporter::{NoticeLevel, Reporter};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use zeroize::Zeroizing;

/// How often the streaming loop checks whether the child is still alive.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to keep draining output after the child has exited. Grandchildren
/// that inherited the pipes can otherwise hold them open forever.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// What to do when a command exits non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPolicy {
    /// Abort the run.
    FailFast,
    /// Log, report and continue.
    Continue,
}

/// Whether command output is streamed to the operator while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Quiet,
    Stream,
}

/// A command line plus how it must be treated.
#[derive(Clone)]
pub struct Invocation {
    line: String,
    destructive: bool,
    secret_stdin: Option<Zeroizing<String>>,
}

impl Invocation {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            destructive: false,
            secret_stdin: None,
        }
    }

    /// Mark the command as state-changing (skipped in dry-run).
    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    /// Feed `secret` to the child's stdin. It is never logged.
    pub fn with_secret_stdin(mut self, secret: Zeroizing<String>) -> Self {
        self.secret_stdin = Some(secret);
        self
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn is_destructive(&self) -> bool {
        self.destructive
    }

    pub fn secret_stdin(&self) -> Option<&str> {
        self.secret_stdin.as_ref().map(|s| s.as_str())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("line", &self.line)
            .field("destructive", &self.destructive)
            .field("secret_stdin", &self.secret_stdin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn from_status(status: ExitStatus, stdout: String, stderr: String) -> Self {
        Self {
            exit_code: status.code(),
            stdout,
            stderr,
        }
    }
}

/// Executes command lines on behalf of the runner.
pub trait Shell {
    /// Run to completion, capturing stdout and stderr.
    fn capture(&mut self, invocation: &Invocation) -> io::Result<CommandResult>;

    /// Run to completion, handing each stdout line to `on_line` as it arrives.
    fn stream(
        &mut self,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> io::Result<CommandResult>;

    /// Run attached to the operator's terminal. Returns the exit code.
    fn interactive(&mut self, invocation: &Invocation) -> io::Result<Option<i32>>;
}

/// `Shell` backed by `sh -c` on the host.
#[derive(Debug, Default)]
pub struct HostShell;

impl HostShell {
    pub fn new() -> Self {
        Self
    }

    fn spawn(invocation: &Invocation) -> io::Result<Child> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(invocation.line())
            .stdin(if invocation.secret_stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group();

        let mut child = cmd.spawn()?;
        if let Some(secret) = &invocation.secret_stdin {
            feed_stdin(&mut child, secret)?;
        }
        Ok(child)
    }
}

/// Write `secret` to the child's stdin and close it. A failed write kills
/// and reaps the child before the error is returned.
fn feed_stdin(child: &mut Child, secret: &str) -> io::Result<()> {
    let Some(mut stdin) = child.stdin.take() else {
        return Ok(());
    };
    if let Err(e) = stdin.write_all(secret.as_bytes()) {
        drop(stdin);
        if let Err(kill_err) = child.kill() {
            tracing::debug!("kill after stdin failure: {}", kill_err);
        }
        child.wait()?;
        return Err(e);
    }
    Ok(())
}

enum StreamLine {
    Stdout(String),
    Stderr(String),
}

fn drain<R: Read + Send + 'static>(
    reader: R,
    tx: mpsc::Sender<StreamLine>,
    wrap: fn(String) -> StreamLine,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines().map_while(std::result::Result::ok) {
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    })
}

impl Shell for HostShell {
    fn capture(&mut self, invocation: &Invocation) -> io::Result<CommandResult> {
        let child = Self::spawn(invocation)?;
        let _registered = RegisteredChild::new(child.id());
        let output = child.wait_with_output()?;
        Ok(CommandResult::from_status(
            output.status,
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }

    fn stream(
        &mut self,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> io::Result<CommandResult> {
        let mut child = Self::spawn(invocation)?;
        let _registered = RegisteredChild::new(child.id());

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            readers.push(drain(out, tx.clone(), StreamLine::Stdout));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(drain(err, tx.clone(), StreamLine::Stderr));
        }
        drop(tx);

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exited: Option<(ExitStatus, Instant)> = None;

        // Interleave draining with liveness checks so a slow command keeps
        // producing output and a dead one is noticed.
        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(StreamLine::Stdout(line)) => {
                    on_line(&line);
                    stdout.push(line);
                }
                Ok(StreamLine::Stderr(line)) => stderr.push(line),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => match exited {
                    Some((_, at)) if at.elapsed() > DRAIN_GRACE => break,
                    Some(_) => {}
                    None => {
                        if let Some(status) = child.try_wait()? {
                            exited = Some((status, Instant::now()));
                        }
                    }
                },
            }
        }

        let status = match exited {
            Some((status, _)) => status,
            None => child.wait()?,
        };
        let all_drained = readers.iter().all(|r| r.is_finished());
        if all_drained {
            for reader in readers {
                let _ = reader.join();
            }
        }

        Ok(CommandResult::from_status(
            status,
            stdout.join("\n"),
            stderr.join("\n"),
        ))
    }

    fn interactive(&mut self, invocation: &Invocation) -> io::Result<Option<i32>> {
        // Stays in the installer's process group: the tool needs the terminal.
        let status = Command::new("sh").arg("-c").arg(invocation.line()).status()?;
        Ok(status.code())
    }
}

/// Applies logging, failure policy, progress and dry-run to a `Shell`.
pub struct CommandRunner {
    shell: Box<dyn Shell>,
    dry_run: bool,
}

impl CommandRunner {
    pub fn new(shell: Box<dyn Shell>, dry_run: bool) -> Self {
        Self { shell, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Execute one command.
    ///
    /// Returns `Ok(Some(result))` on success, `Ok(None)` for a tolerated
    /// failure under `FailPolicy::Continue`, and `Err(CommandFailed)` for a
    /// failure under `FailPolicy::FailFast`.
    pub fn execute(
        &mut self,
        invocation: &Invocation,
        policy: FailPolicy,
        progress: Progress,
        log: &InstallLog,
        reporter: &mut dyn Reporter,
    ) -> Result<Option<CommandResult>> {
        let line = invocation.line();
        log.append(format!("Executing: {}", line));

        if self.dry_run && invocation.is_destructive() {
            log.append(format!("DRY-RUN: skipped {}", line));
            reporter.notice(NoticeLevel::Info, &format!("[dry-run] {}", line));
            return Ok(Some(CommandResult {
                exit_code: Some(0),
                ..CommandResult::default()
            }));
        }

        let outcome = match progress {
            Progress::Quiet => self.shell.capture(invocation),
            Progress::Stream => {
                reporter.notice(NoticeLevel::Info, &format!("Running: {}", line));
                let mut forward = |out: &str| reporter.show_output(out);
                self.shell.stream(invocation, &mut forward)
            }
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => CommandResult {
                exit_code: None,
                stdout: String::new(),
                stderr: format!("failed to start: {}", e),
            },
        };

        let stdout = redact(&result.stdout, invocation.secret_stdin());
        let stderr = redact(&result.stderr, invocation.secret_stdin());

        if result.success() {
            log.command(line, &stdout, &stderr);
            if progress == Progress::Stream {
                reporter.notice(NoticeLevel::Success, "Done");
            }
            return Ok(Some(result));
        }

        let code = result.exit_code.unwrap_or(-1);
        log.append(format!("Command failed: {}", line));
        log.append(format!("Error code: {}", code));
        log.append(format!("Error message: {}", stderr.trim()));

        match policy {
            FailPolicy::FailFast => {
                reporter.show_panel(
                    "COMMAND FAILED",
                    &[
                        format!("Command: {}", line),
                        format!("Exit code: {}", code),
                        format!("Message: {}", stderr.trim()),
                    ],
                    Some("The installation cannot continue"),
                );
                Err(InstallerError::CommandFailed {
                    command: line.to_string(),
                    code,
                    stderr: stderr.trim().to_string(),
                })
            }
            FailPolicy::Continue => {
                reporter.notice(
                    NoticeLevel::Warning,
                    &format!("`{}` failed (exit code {}), continuing", line, code),
                );
                Ok(None)
            }
        }
    }

    /// Hand the terminal to an interactive tool; a non-zero exit is fatal.
    pub fn run_interactive(
        &mut self,
        invocation: &Invocation,
        log: &InstallLog,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let line = invocation.line();
        log.append(format!("Executing interactively: {}", line));

        if self.dry_run && invocation.is_destructive() {
            log.append(format!("DRY-RUN: skipped {}", line));
            reporter.notice(NoticeLevel::Info, &format!("[dry-run] {}", line));
            return Ok(());
        }

        match self.shell.interactive(invocation) {
            Ok(Some(0)) => {
                log.append(format!("COMMAND: {} (exit code 0)", line));
                Ok(())
            }
            outcome => {
                let (code, message) = match outcome {
                    Ok(code) => (code.unwrap_or(-1), "terminated abnormally".to_string()),
                    Err(e) => (-1, format!("failed to start: {}", e)),
                };
                log.append(format!("Command failed: {}", line));
                log.append(format!("Error code: {}", code));
                log.append(format!("Error message: {}", message));
                reporter.show_panel(
                    "COMMAND FAILED",
                    &[format!("Command: {}", line), format!("Exit code: {}", code)],
                    Some("The installation cannot continue"),
                );
                Err(InstallerError::CommandFailed {
                    command: line.to_string(),
                    code,
                    stderr: message,
                })
            }
        }
    }
}

/// Mask the password part of each secret line wherever it appears in `text`.
fn redact(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() => {
            let mut out = text.to_string();
            // chpasswd input is `name:password`; only the password is secret
            let parts = secret
                .lines()
                .map(|l| l.split_once(':').map_or(l, |(_, p)| p))
                .filter(|p| !p.is_empty());
            for part in parts {
                out = out.replace(part, "********");
            }
            out
        }
        _ => text.to_string(),
    }
}
