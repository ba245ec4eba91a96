//! Shared UI utilities for consistent terminal output.

use colored::Colorize;
use livefeed_sdk::ConnectionState;

/// Standard symbols used throughout the CLI for consistent visual language.
pub mod symbols {
    /// Arrow for action/progress indicators
    pub const ARROW: &str = "→";
    /// Checkmark for success
    pub const SUCCESS: &str = "✓";
    /// Warning/attention indicator
    pub const WARNING: &str = "!";
    /// Active/running indicator
    pub const ACTIVE: &str = "●";
    /// Inactive/stopped indicator
    pub const INACTIVE: &str = "○";
    /// In-progress indicator
    pub const IN_PROGRESS: &str = "◐";
}

/// Print a step header with the action arrow.
pub fn print_step(message: &str) {
    println!("{} {}", symbols::ARROW.blue().bold(), message);
}

pub fn print_success(message: &str) {
    println!("{} {}", symbols::SUCCESS.green().bold(), message);
}

/// Warnings go to stderr so piped payload output stays clean.
pub fn print_warning(message: &str) {
    eprintln!("{} {}", symbols::WARNING.yellow().bold(), message);
}

/// Print a dimmed info line (indented).
pub fn print_info(message: &str) {
    println!("  {}", message.dimmed());
}

/// Print a key-value pair with consistent formatting.
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", key).dimmed(), value);
}

/// Format a connection state with a colored status symbol.
pub fn format_state(state: ConnectionState) -> String {
    match state {
        ConnectionState::Connected => {
            format!("{} {}", symbols::ACTIVE.green(), "connected".green())
        }
        ConnectionState::Connecting => {
            format!("{} {}", symbols::IN_PROGRESS.yellow(), "connecting".yellow())
        }
        ConnectionState::Reconnecting { attempt } => format!(
            "{} {}",
            symbols::IN_PROGRESS.yellow(),
            format!("reconnecting (attempt {})", attempt).yellow()
        ),
        ConnectionState::Disconnected => {
            format!("{} {}", symbols::INACTIVE.dimmed(), "disconnected".dimmed())
        }
    }
}

/// Get the current time formatted for log output.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
