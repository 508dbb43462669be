//! Display framework for CLI output formatting.
//!
//! Shared primitives for colors, tables, formatting, and detail views used
//! by the command modules.

pub mod colors;
pub mod detail;
pub mod format;
pub mod table;

pub use colors::*;
pub use detail::*;
pub use format::*;
pub use table::*;

/// Render a success action result.
pub fn action_success(message: &str) -> String {
    use colored::Colorize;
    format!("{} {}", "\u{2713}".green().bold(), message)
}

/// Render a failure action result.
pub fn action_failure(message: &str) -> String {
    use colored::Colorize;
    format!("{} {}", "\u{2717}".red().bold(), message)
}
