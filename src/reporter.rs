//! Operator-facing reporting interface
//!
//! The pipeline talks to the operator only through the `Reporter` trait:
//! panels, progress, streamed command output, notices and prompts. Nothing in
//! the pipeline assumes a rendering technology. `TerminalReporter` is the
//! crossterm/dialoguer front end used by the binary.

use crate::error::{InstallerError, Result};
use crossterm::{
    cursor::MoveTo,
    style::Stylize,
    terminal::{Clear, ClearType},
    ExecutableCommand,
};
use std::io::{self, Write};
use zeroize::Zeroizing;

/// Default panel width in columns.
pub const PANEL_WIDTH: usize = 80;

/// Severity of a one-line notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Everything the pipeline needs from a front end.
pub trait Reporter {
    /// Show a titled block of lines with an optional footer.
    fn show_panel(&mut self, title: &str, lines: &[String], footer: Option<&str>);

    /// Show overall progress (`current` of `total`).
    fn show_progress(&mut self, description: &str, current: usize, total: usize);

    /// Show one line of output from a running command.
    fn show_output(&mut self, line: &str);

    /// Show a one-line notice.
    fn notice(&mut self, level: NoticeLevel, message: &str);

    /// Read a line of operator input.
    fn prompt(&mut self, text: &str) -> Result<String>;

    /// Read a line of operator input without echoing it.
    fn prompt_secret(&mut self, text: &str) -> Result<Zeroizing<String>>;

    /// Wait for the operator to press Enter.
    fn pause(&mut self, text: &str) -> Result<()> {
        self.prompt(text).map(|_| ())
    }
}

/// Center `text` in `width` columns (left-biased, never truncates).
pub fn center_text(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let padding = width.saturating_sub(len) / 2;
    format!("{}{}", " ".repeat(padding), text)
}

/// Render a rounded box panel: title, separator, centered lines, optional footer.
pub fn render_panel(title: &str, lines: &[String], footer: Option<&str>, width: usize) -> String {
    let inner = width.saturating_sub(2);
    let row = |text: &str| {
        let centered = center_text(text, inner);
        let pad = inner.saturating_sub(centered.chars().count());
        format!("│{}{}│\n", centered, " ".repeat(pad))
    };
    let rule = |left: char, right: char| format!("{}{}{}\n", left, "─".repeat(inner), right);

    let mut out = rule('╭', '╮');
    out.push_str(&row(title));
    out.push_str(&rule('├', '┤'));
    for line in lines {
        out.push_str(&row(line));
    }
    if let Some(footer) = footer {
        out.push_str(&rule('├', '┤'));
        out.push_str(&row(footer));
    }
    out.push_str(&rule('╰', '╯'));
    out
}

/// Text progress bar: `|█████-----| 50.0%`.
pub fn progress_bar(current: usize, total: usize, length: usize) -> String {
    let total = total.max(1);
    let current = current.min(total);
    let filled = length * current / total;
    let percent = 100.0 * current as f64 / total as f64;
    format!(
        "|{}{}| {:.1}%",
        "█".repeat(filled),
        "-".repeat(length - filled),
        percent
    )
}

/// Terminal front end: crossterm for layout and color, dialoguer for input.
#[derive(Debug)]
pub struct TerminalReporter {
    width: usize,
}

impl TerminalReporter {
    pub fn new() -> Self {
        let width = crossterm::terminal::size()
            .map(|(cols, _)| (cols as usize).min(PANEL_WIDTH))
            .unwrap_or(PANEL_WIDTH);
        Self { width }
    }

    fn clear(&self) {
        let mut stdout = io::stdout();
        let _ = stdout.execute(Clear(ClearType::All));
        let _ = stdout.execute(MoveTo(0, 0));
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for TerminalReporter {
    fn show_panel(&mut self, title: &str, lines: &[String], footer: Option<&str>) {
        self.clear();
        let panel = render_panel(title, lines, footer, self.width);
        println!("{}", panel.cyan());
    }

    fn show_progress(&mut self, description: &str, current: usize, total: usize) {
        println!(
            "{} {}",
            progress_bar(current, total, 40).green(),
            description.bold()
        );
    }

    fn show_output(&mut self, line: &str) {
        println!("  {} {}", "│".dark_grey(), line.dark_grey());
    }

    fn notice(&mut self, level: NoticeLevel, message: &str) {
        let line = center_text(message, self.width);
        match level {
            NoticeLevel::Info => println!("{}", line),
            NoticeLevel::Success => println!("{}", format!("✓ {}", line.trim_start()).green()),
            NoticeLevel::Warning => println!("{}", format!("! {}", line.trim_start()).yellow()),
            NoticeLevel::Error => eprintln!("{}", format!("✗ {}", line.trim_start()).red().bold()),
        }
        let _ = io::stdout().flush();
    }

    fn prompt(&mut self, text: &str) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(text)
            .allow_empty(true)
            .interact_text()
            .map(|s| s.trim().to_string())
            .map_err(map_dialoguer_error)
    }

    fn prompt_secret(&mut self, text: &str) -> Result<Zeroizing<String>> {
        dialoguer::Password::new()
            .with_prompt(text)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(map_dialoguer_error)
    }
}

#[allow(unreachable_patterns)]
fn map_dialoguer_error(err: dialoguer::Error) -> InstallerError {
    match err {
        dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            InstallerError::InputClosed
        }
        dialoguer::Error::IO(e) => InstallerError::terminal(e.to_string()),
        other => InstallerError::terminal(other.to_string()),
    }
}
