//! Terminal output utilities
//!
//! Status lines go to stderr for problems and stdout for everything else.
//! `--quiet` silences the stdout ones.

use owo_colors::{OwoColorize, Stream};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

static QUIET: AtomicBool = AtomicBool::new(false);

/// Status message helpers
pub struct Status;

impl Status {
    /// Suppress success and header output
    pub fn set_quiet(quiet: bool) {
        QUIET.store(quiet, Ordering::Relaxed);
    }

    fn quiet() -> bool {
        QUIET.load(Ordering::Relaxed)
    }

    /// Print a success message
    pub fn success(message: &str) {
        if !Self::quiet() {
            println!("{} {}", "✓".if_supports_color(Stream::Stdout, |t| t.green()), message);
        }
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".if_supports_color(Stream::Stderr, |t| t.red()), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".if_supports_color(Stream::Stderr, |t| t.yellow()), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        if Self::quiet() {
            return;
        }
        println!();
        println!("{}", message.if_supports_color(Stream::Stdout, |t| t.bold()));
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// Format a `label: value` row with the label padded to `width`
pub fn field(label: &str, value: impl Display, width: usize) -> String {
    format!(
        "  {:<width$} {}",
        format!("{}:", label),
        value,
        width = width + 1
    )
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let micros = duration.as_micros();
    if micros < 1_000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
