//! Colored status messages for the command line.
//!
//! Everything here writes to stderr so stdout carries only citations.

use owo_colors::OwoColorize;
use std::io::IsTerminal;

/// Check if stderr is a terminal.
pub fn is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different outcomes.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Format a status line, colored when `color` is set.
pub fn format_status(status: Status, msg: &str, color: bool) -> String {
    let icon = status_icon(status);
    if !color {
        return format!("{} {}", icon, msg);
    }
    match status {
        Status::Success => format!("{} {}", icon.green().bold(), msg),
        Status::Error => format!("{} {}", icon.red().bold(), msg.red()),
        Status::Warning => format!("{} {}", icon.yellow().bold(), msg),
        Status::Info => format!("{} {}", icon.cyan().bold(), msg.dimmed()),
    }
}

/// Print a styled status message to stderr.
pub fn print_status(status: Status, msg: &str) {
    eprintln!("{}", format_status(status, msg, is_terminal()));
}

pub fn print_error(msg: &str) {
    print_status(Status::Error, msg);
}

pub fn print_warning(msg: &str) {
    print_status(Status::Warning, msg);
}

pub fn print_success(msg: &str) {
    print_status(Status::Success, msg);
}

pub fn print_info(msg: &str) {
    print_status(Status::Info, msg);
}
