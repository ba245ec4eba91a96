use anyhow::{Context, Result};
use livefeed_sdk::FeedConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Contents of livefeed.toml. Every field is optional; command-line flags
/// and `LIVEFEED_*` environment variables take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LivefeedConfig {
    /// Endpoint used by `lf tail` when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,

    /// Retries before giving up; absent means retry forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub pretty: bool,

    #[serde(default)]
    pub json_logs: bool,
}

/// Values supplied on the command line (or through the environment).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub no_reconnect: bool,
    pub pretty: bool,
    pub json_logs: bool,
}

/// Fully merged settings for one `lf tail` run.
#[derive(Debug, Clone)]
pub struct TailSettings {
    pub endpoint: String,
    pub feed: FeedConfig,
    pub pretty: bool,
    pub json_logs: bool,
}

impl LivefeedConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: LivefeedConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Try to load config, returning None if file doesn't exist
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint {
            if endpoint.trim().is_empty() {
                anyhow::bail!("endpoint cannot be empty");
            }
        }

        let reconnect = &self.reconnect;
        if reconnect.base_delay_ms == Some(0) {
            anyhow::bail!("reconnect.base_delay_ms must be greater than zero");
        }
        if let (Some(base), Some(max)) = (reconnect.base_delay_ms, reconnect.max_delay_ms) {
            if max < base {
                anyhow::bail!(
                    "reconnect.max_delay_ms ({}) is smaller than reconnect.base_delay_ms ({})",
                    max,
                    base
                );
            }
        }

        Ok(())
    }

    /// Merges file values with command-line overrides.
    pub fn resolve(&self, overrides: Overrides) -> Result<TailSettings> {
        let endpoint = overrides
            .endpoint
            .or_else(|| self.endpoint.clone())
            .context("No endpoint given. Pass one to `lf tail` or set `endpoint` in livefeed.toml.")?;

        let reconnect = &self.reconnect;
        let mut feed = FeedConfig::default();
        if let Some(ms) = overrides.base_delay_ms.or(reconnect.base_delay_ms) {
            feed = feed.with_base_delay_ms(ms);
        }
        if let Some(ms) = overrides.max_delay_ms.or(reconnect.max_delay_ms) {
            feed = feed.with_max_delay_ms(ms);
        }
        if let Some(attempts) = overrides.max_attempts.or(reconnect.max_attempts) {
            feed = feed.with_max_attempts(attempts);
        }
        if let Some(secs) = reconnect.ping_interval_secs {
            feed = feed.with_ping_interval(Duration::from_secs(secs));
        }
        let enabled = !overrides.no_reconnect && reconnect.enabled.unwrap_or(true);
        feed = feed.with_auto_reconnect(enabled);

        if feed.max_delay < feed.base_delay {
            anyhow::bail!(
                "max delay ({:?}) is smaller than base delay ({:?})",
                feed.max_delay,
                feed.base_delay
            );
        }

        Ok(TailSettings {
            endpoint,
            feed,
            pretty: overrides.pretty || self.output.pretty,
            json_logs: overrides.json_logs || self.output.json_logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(toml_str: &str) -> LivefeedConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("");
        let settings = config
            .resolve(Overrides {
                endpoint: Some("ws://localhost:8080".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(settings.endpoint, "ws://localhost:8080");
        assert_eq!(settings.feed.base_delay, Duration::from_millis(1000));
        assert_eq!(settings.feed.max_delay, Duration::from_millis(30000));
        assert_eq!(settings.feed.max_attempts, None);
        assert!(settings.feed.auto_reconnect);
        assert!(!settings.pretty);
    }

    #[test]
    fn test_flags_override_file() {
        let config = parse(
            r#"
            endpoint = "wss://feed.example/ticks"

            [reconnect]
            base_delay_ms = 250
            max_delay_ms = 4000
            max_attempts = 3

            [output]
            pretty = true
            "#,
        );

        let settings = config
            .resolve(Overrides {
                max_attempts: Some(10),
                no_reconnect: true,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(settings.endpoint, "wss://feed.example/ticks");
        assert_eq!(settings.feed.base_delay, Duration::from_millis(250));
        assert_eq!(settings.feed.max_delay, Duration::from_millis(4000));
        assert_eq!(settings.feed.max_attempts, Some(10));
        assert!(!settings.feed.auto_reconnect);
        assert!(settings.pretty);
    }

    #[test]
    fn test_missing_endpoint_is_an_error() {
        let err = LivefeedConfig::default()
            .resolve(Overrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("No endpoint given"));
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let config = parse(
            r#"
            [reconnect]
            base_delay_ms = 5000
            max_delay_ms = 1000
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<LivefeedConfig>("endpont = \"ws://typo\"").is_err());
    }

    #[test]
    fn test_load_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("livefeed.toml");
        assert!(LivefeedConfig::load_optional(&path).unwrap().is_none());

        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "endpoint = \"ws://127.0.0.1:9000/feed\"").unwrap();

        let config = LivefeedConfig::load_optional(&path).unwrap().unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("ws://127.0.0.1:9000/feed"));
    }
}
