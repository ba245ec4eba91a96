use std::time::Duration;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_UPDATE_BUFFER: usize = 1024;

/// Client configuration. The endpoint is passed separately and is
/// immutable once the client is opened.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Delay before the first retry; doubled for each consecutive failure.
    pub base_delay: Duration,
    /// Upper bound for any single retry delay.
    pub max_delay: Duration,
    /// Consecutive retries allowed before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
    pub auto_reconnect: bool,
    /// Keepalive ping period while connected.
    pub ping_interval: Duration,
    /// Capacity of the broadcast buffer behind `watch()` streams.
    pub update_buffer: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: None,
            auto_reconnect: true,
            ping_interval: DEFAULT_PING_INTERVAL,
            update_buffer: DEFAULT_UPDATE_BUFFER,
        }
    }
}

impl FeedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_base_delay_ms(self, ms: u64) -> Self {
        self.with_base_delay(Duration::from_millis(ms))
    }

    pub fn with_max_delay_ms(self, ms: u64) -> Self {
        self.with_max_delay(Duration::from_millis(ms))
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_unlimited_attempts(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_update_buffer(mut self, capacity: usize) -> Self {
        self.update_buffer = capacity.max(1);
        self
    }
}
