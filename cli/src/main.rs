//! # livefeed-cli
//!
//! Terminal client for live WebSocket feeds.
//!
//! ## Commands
//!
//! - `lf tail <endpoint>` - Print every payload with its sequence number,
//!   along with connection state changes and reported errors
//! - `lf config validate` - Check livefeed.toml and show the effective settings
//!
//! Every `tail` flag can also be set through a `LIVEFEED_*` environment
//! variable. See `lf --help` for the full command reference.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::process;

mod commands;
mod config;
mod ui;

use config::Overrides;

#[derive(Parser)]
#[command(name = "lf")]
#[command(about = "Livefeed CLI - tail live WebSocket feeds", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to livefeed.toml configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "LIVEFEED_CONFIG",
        default_value = "livefeed.toml"
    )]
    config: String,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to an endpoint and print payloads as they arrive
    Tail {
        /// WebSocket URL (ws:// or wss://); falls back to `endpoint` in livefeed.toml
        #[arg(env = "LIVEFEED_ENDPOINT")]
        endpoint: Option<String>,

        /// Delay before the first reconnect attempt
        #[arg(long, env = "LIVEFEED_BASE_DELAY_MS")]
        base_delay_ms: Option<u64>,

        /// Upper bound for any reconnect delay
        #[arg(long, env = "LIVEFEED_MAX_DELAY_MS")]
        max_delay_ms: Option<u64>,

        /// Give up after this many consecutive failed reconnects
        #[arg(long, env = "LIVEFEED_MAX_ATTEMPTS")]
        max_attempts: Option<u32>,

        /// Exit on the first connection loss instead of reconnecting
        #[arg(long, env = "LIVEFEED_NO_RECONNECT")]
        no_reconnect: bool,

        /// Pretty-print JSON payloads
        #[arg(long, env = "LIVEFEED_PRETTY")]
        pretty: bool,

        /// Emit logs as JSON on stderr
        #[arg(long, env = "LIVEFEED_JSON_LOGS")]
        json_logs: bool,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate the configuration file
    Validate,
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "lf", &mut io::stdout());
        return;
    }

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Tail {
            endpoint,
            base_delay_ms,
            max_delay_ms,
            max_attempts,
            no_reconnect,
            pretty,
            json_logs,
        } => commands::tail::tail(
            &cli.config,
            Overrides {
                endpoint,
                base_delay_ms,
                max_delay_ms,
                max_attempts,
                no_reconnect,
                pretty,
                json_logs,
            },
        ),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Validate => commands::config::validate(&cli.config),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tail_flags_parse() {
        let cli = Cli::try_parse_from([
            "lf",
            "tail",
            "wss://example/feed",
            "--max-attempts",
            "7",
            "--no-reconnect",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Tail {
                endpoint,
                max_attempts,
                no_reconnect,
                pretty,
                ..
            }) => {
                assert_eq!(endpoint.as_deref(), Some("wss://example/feed"));
                assert_eq!(max_attempts, Some(7));
                assert!(no_reconnect);
                assert!(!pretty);
            }
            _ => panic!("expected tail command"),
        }
    }
}
