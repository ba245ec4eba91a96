use anyhow::{Context, Result};
use colored::Colorize;
use futures_util::StreamExt;
use livefeed_sdk::telemetry::{self, TelemetryConfig};
use livefeed_sdk::{ErrorEvent, ErrorKind, FeedClient, Payload, Value};
use tokio::sync::mpsc;

use crate::config::{LivefeedConfig, Overrides, TailSettings};
use crate::ui;

pub fn tail(config_path: &str, overrides: Overrides) -> Result<()> {
    let config = LivefeedConfig::load_optional(config_path)?.unwrap_or_default();
    let settings = config.resolve(overrides)?;

    telemetry::init(TelemetryConfig::new("error").with_json_logs(settings.json_logs))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run(settings))
}

async fn run(settings: TailSettings) -> Result<()> {
    let (give_up_tx, mut give_up_rx) = mpsc::unbounded_channel();
    let pretty = settings.pretty;

    let client = FeedClient::<Value>::builder(settings.endpoint.as_str())
        .config(settings.feed)
        .on_error(move |event: &ErrorEvent| {
            print_error_event(event);
            if event.kind == ErrorKind::GiveUp {
                let _ = give_up_tx.send(event.detail.clone());
            }
        })
        .open()
        .context("Failed to open feed")?;

    ui::print_step(&format!("Tailing {}", client.endpoint().to_string().cyan()));

    client.subscribe(move |payload: &Payload<Value>| print_payload(payload, pretty))?;

    let mut states = client.state_changes();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                break Ok(());
            }
            Some(state) = states.next() => {
                eprintln!("{} {}", ui::timestamp_now().dimmed(), ui::format_state(state));
            }
            Some(detail) = give_up_rx.recv() => {
                break Err(anyhow::anyhow!(detail));
            }
        }
    };

    let last = client.latest();
    client.close();

    match &last {
        Some(payload) => ui::print_info(&format!("last sequence #{}", payload.sequence)),
        None => ui::print_info("no payloads received"),
    }

    outcome
}

fn print_payload(payload: &Payload<Value>, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(&payload.value)
    } else {
        serde_json::to_string(&payload.value)
    };

    match rendered {
        Ok(body) => println!(
            "{} {} {}",
            ui::timestamp_now().dimmed(),
            format!("#{}", payload.sequence).bold(),
            body
        ),
        Err(e) => ui::print_warning(&format!("cannot render payload #{}: {}", payload.sequence, e)),
    }
}

fn print_error_event(event: &ErrorEvent) {
    if let Some(message) = observer_message(event) {
        ui::print_warning(&message);
    }
}

/// Line printed for a reported error while tailing. Terminal errors are
/// `None`: they come back as the `Err` that `main` prints.
fn observer_message(event: &ErrorEvent) -> Option<String> {
    match event.kind {
        ErrorKind::GiveUp | ErrorKind::InvalidEndpoint | ErrorKind::NoRuntime => None,
        _ => Some(format!("{}: {}", event.kind, event.detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: ErrorKind, detail: &str) -> ErrorEvent {
        ErrorEvent {
            kind,
            detail: detail.to_string(),
        }
    }

    #[test]
    fn test_terminal_errors_are_not_printed_by_observer() {
        let give_up = event(ErrorKind::GiveUp, "Gave up reconnecting after 7 attempts");
        assert_eq!(observer_message(&give_up), None);

        let invalid = event(ErrorKind::InvalidEndpoint, "Invalid endpoint \"x\": missing host");
        assert_eq!(observer_message(&invalid), None);
    }

    #[test]
    fn test_recoverable_errors_are_printed() {
        let decode = event(ErrorKind::DecodeFailure, "Failed to decode frame: eof");
        assert_eq!(
            observer_message(&decode).as_deref(),
            Some("decode_failure: Failed to decode frame: eof")
        );
    }
}
