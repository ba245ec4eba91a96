use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::{LivefeedConfig, Overrides};
use crate::ui;

pub fn validate(config_path: &str) -> Result<()> {
    ui::print_step("Validating configuration...");

    if !Path::new(config_path).exists() {
        anyhow::bail!(
            "Configuration file {} not found. All settings can also be passed as flags.",
            config_path
        );
    }

    let config = LivefeedConfig::load(config_path).context("Failed to load configuration")?;
    ui::print_success("Configuration is valid!");
    println!();

    match &config.endpoint {
        Some(endpoint) => ui::print_kv("Endpoint", &endpoint.bold().to_string()),
        None => ui::print_kv("Endpoint", &"(pass on the command line)".dimmed().to_string()),
    }

    let feed = config
        .resolve(Overrides {
            endpoint: Some(String::new()),
            ..Default::default()
        })?
        .feed;

    ui::print_kv("Base delay", &format!("{:?}", feed.base_delay));
    ui::print_kv("Max delay", &format!("{:?}", feed.max_delay));
    ui::print_kv(
        "Max attempts",
        &feed
            .max_attempts
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unlimited".to_string()),
    );
    ui::print_kv(
        "Reconnect",
        if feed.auto_reconnect { "enabled" } else { "disabled" },
    );
    ui::print_kv("Ping interval", &format!("{:?}", feed.ping_interval));

    if config.output.pretty || config.output.json_logs {
        println!();
        if config.output.pretty {
            ui::print_info("payloads are pretty-printed");
        }
        if config.output.json_logs {
            ui::print_info("logs are written as JSON");
        }
    }

    Ok(())
}
