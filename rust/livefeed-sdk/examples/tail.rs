use livefeed_sdk::prelude::*;
use livefeed_sdk::telemetry::{self, TelemetryConfig};
use serde::Deserialize;
use tokio::time::{sleep, Duration};

#[derive(Deserialize, Debug, Clone)]
struct NodeTelemetry {
    node: String,
    #[serde(default)]
    battery_level: Option<u8>,
    #[serde(default)]
    voltage: Option<f32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init(TelemetryConfig::new("info,livefeed_sdk=debug"))?;

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8000/ws/telemetry".to_string());

    let client = FeedClient::<NodeTelemetry>::builder(url)
        .base_delay(Duration::from_millis(500))
        .max_delay(Duration::from_secs(10))
        .on_error(|event| eprintln!("[{}] {}", event.kind, event.detail))
        .open()?;

    client.subscribe(|payload| {
        let reading = &payload.value;
        println!(
            "#{} node={} battery={:?} voltage={:?}",
            payload.sequence, reading.node, reading.battery_level, reading.voltage
        );
    })?;

    let mut states = client.state_changes();
    let report = sleep(Duration::from_secs(60));
    tokio::pin!(report);

    loop {
        tokio::select! {
            Some(state) = states.next() => println!("state: {:?}", state),
            _ = &mut report => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    match client.latest() {
        Some(last) => println!("last reading #{} from {}", last.sequence, last.value.node),
        None => println!("no readings received"),
    }
    client.close();

    Ok(())
}
