//! Terminal styling helpers
//!
//! Output goes through `anstream`, which strips escapes when stdout is not
//! a terminal.

use owo_colors::OwoColorize;
use std::fmt::Display;

/// Check mark used in summaries
pub const CHECK: &str = "✓";

/// Semantic styles for CLI output
pub trait Stylize {
    /// De-emphasized text
    fn muted(&self) -> String;
    /// Bold text
    fn emphasis(&self) -> String;
    /// Names and identifiers
    fn accent(&self) -> String;
    /// Something needs attention
    fn warn(&self) -> String;
    /// Something succeeded
    fn success(&self) -> String;
}

impl<T: Display + ?Sized> Stylize for T {
    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    fn warn(&self) -> String {
        self.yellow().to_string()
    }

    fn success(&self) -> String {
        self.green().to_string()
    }
}
