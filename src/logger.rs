//! Logging utilities with colored output.
//!
//! All output goes to stderr so that stdout stays free for document and JSON
//! output (`turnmark annotate` without `-o`, `turnmark query`).
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, only printed with `--verbose`
//! - `WatchStatus` for watch mode status messages
//!
//! # Example
//!
//! ```ignore
//! log!("annotate"; "{} user turns labeled", count);
//! debug!("watch"; "settle delay {}ms", delay);
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::{OwoColorize, Stream, Style};
use parking_lot::Mutex;
use std::{
    io::{Write, stderr},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stderr = stderr().lock();
    writeln!(stderr, "{prefix} {message}").ok();
    stderr.flush().ok();
}

/// Apply color to a module prefix based on module type
///
/// Honors `--color` through the owo-colors override.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let style = match module_lower {
        "annotate" | "query" => Style::new().bright_blue().bold(),
        "watch" => Style::new().bright_green().bold(),
        "error" => Style::new().bright_red().bold(),
        _ => Style::new().bright_yellow().bold(),
    };
    let prefix = format!("[{module}]");
    prefix
        .if_supports_color(Stream::Stderr, |p| p.style(style))
        .to_string()
}

// ============================================================================
// Watch Status (single-block status with overwrite)
// ============================================================================

/// Current UTC time formatted as HH:MM:SS
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Number of terminal lines a status message occupies.
fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

/// Status display for watch mode
///
/// Each message overwrites the previous block, so a long watch session shows
/// only the outcome of the latest settled pass.
///
/// # Example
///
/// ```ignore
/// let mut status = WatchStatus::new();
/// status.success("3 user turns, wrote chat.out.html");
/// status.unchanged("no changes");
/// status.error("reload failed", "chat.html: permission denied");
/// ```
pub struct WatchStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

/// Shared between the file reload path and the annotation reaction.
static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        let symbol = "✓".if_supports_color(Stream::Stderr, |s| s.green());
        self.display(symbol.to_string(), message);
    }

    /// Display unchanged message (dimmed, no symbol).
    pub fn unchanged(&mut self, message: &str) {
        let message = message.if_supports_color(Stream::Stderr, |m| m.dimmed());
        self.display(String::new(), &message.to_string());
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        let symbol = "✗".if_supports_color(Stream::Stderr, |s| s.red());
        self.display(symbol.to_string(), &message);
    }

    /// Display warning message (⚠ prefix, yellow).
    pub fn warning(&mut self, detail: &str) {
        let symbol = "⚠".if_supports_color(Stream::Stderr, |s| s.yellow());
        self.display(symbol.to_string(), detail);
    }

    fn display(&mut self, symbol: String, message: &str) {
        let mut stderr = stderr().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stderr, cursor::MoveUp(lines)).ok();
            execute!(stderr, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now())
            .if_supports_color(Stream::Stderr, |t| t.dimmed())
            .to_string();
        let line = if symbol.is_empty() {
            format!("{timestamp} {message}")
        } else {
            format!("{timestamp} {symbol} {message}")
        };

        writeln!(stderr, "{line}").ok();
        stderr.flush().ok();

        self.last_lines = line_count(message);
    }
}

/// Global watch status: success
pub fn status_success(message: &str) {
    WATCH_STATUS.lock().success(message);
}

/// Global watch status: unchanged
pub fn status_unchanged(message: &str) {
    WATCH_STATUS.lock().unchanged(message);
}

/// Global watch status: error
pub fn status_error(summary: &str, detail: &str) {
    WATCH_STATUS.lock().error(summary, detail);
}

/// Global watch status: warning
pub fn status_warning(detail: &str) {
    WATCH_STATUS.lock().warning(detail);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_status_new() {
        let status = WatchStatus::new();
        assert_eq!(status.last_lines, 0);
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count("2 user turns, wrote chat.out.html"), 1);
        assert_eq!(line_count("reload failed\nchat.html: permission denied"), 2);
    }

    #[test]
    fn test_now_format() {
        let time = now();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }

    #[test]
    fn test_prefix_color_follows_override() {
        owo_colors::set_override(false);
        assert_eq!(colorize_prefix("watch", "watch"), "[watch]");
        assert_eq!(colorize_prefix("Annotate", "annotate"), "[Annotate]");

        owo_colors::set_override(true);
        let colored = colorize_prefix("watch", "watch");
        owo_colors::set_override(false);
        assert!(colored.starts_with('\u{1b}'));
        assert!(colored.contains("[watch]"));
    }
}
