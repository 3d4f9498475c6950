//! Styled text helpers for consistent CLI formatting
//!
//! Everything renders into a `fmt::Write` so reports can be built as strings
//! and tested without a terminal.

use std::fmt::{self, Write};
use std::io::IsTerminal;

/// Check if color output is enabled.
///
/// Color is off when `--no-color` is passed, `NO_COLOR` is set, or stdout
/// is not a terminal (e.g. redirected to a file).
pub fn use_color(no_color_flag: bool) -> bool {
    color_enabled(
        no_color_flag,
        std::env::var("NO_COLOR").is_ok(),
        std::io::stdout().is_terminal(),
    )
}

fn color_enabled(no_color_flag: bool, no_color_env: bool, stdout_is_terminal: bool) -> bool {
    !no_color_flag && !no_color_env && stdout_is_terminal
}

/// Output styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub color: bool,
}

impl Style {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    /// Bold text.
    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }

    /// Yellow text.
    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    /// Red text.
    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    /// Dimmed text.
    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    /// Section header with decorative border.
    pub fn header(&self, out: &mut impl Write, title: &str) -> fmt::Result {
        let border = "═".repeat(59);
        writeln!(out)?;
        writeln!(out, "{}", border)?;
        writeln!(out, "{}", self.bold(&format!("{:^59}", title)))?;
        writeln!(out, "{}", border)?;
        writeln!(out)
    }

    /// Indented key-value pair.
    pub fn key_value(&self, out: &mut impl Write, key: &str, value: &str) -> fmt::Result {
        writeln!(out, "  {} {}", self.bold(&format!("{key}:")), value)
    }

    /// Warning line.
    pub fn warning(&self, out: &mut impl Write, message: &str) -> fmt::Result {
        writeln!(out, "{} {}", self.yellow("Warning:"), message)
    }

    /// Info line.
    pub fn info(&self, out: &mut impl Write, message: &str) -> fmt::Result {
        if self.color {
            writeln!(out, "\x1b[34mℹ\x1b[0m {}", message)
        } else {
            writeln!(out, "Info: {}", message)
        }
    }
}
