use crate::backoff::Backoff;
use crate::config::FeedConfig;
use crate::endpoint::Endpoint;
use crate::error::{ErrorChannel, FeedError, Result};
use crate::transport::{Connector, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{sleep, Instant, Interval};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting for, or performing, retry number `attempt` (1-based).
    Reconnecting { attempt: u32 },
}

/// Internal consumer of raw inbound frames.
pub(crate) trait FrameSink: Send + Sync + 'static {
    fn on_frame(&self, frame: &[u8]);
}

struct ConnectionManagerInner {
    endpoint: Endpoint,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl ConnectionManagerInner {
    /// Applies a state change unless the connection was closed. The check and
    /// the write happen under the watch lock, so `close()` always wins.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut open = false;
        self.state_tx.send_if_modified(|state| {
            if self.cancel.is_cancelled() {
                return false;
            }
            open = true;
            if *state == next {
                return false;
            }
            debug!("connection state {:?} -> {:?}", state, next);
            *state = next;
            true
        });
        open
    }
}

/// Owns the transport lifecycle for one endpoint: connect, detect loss,
/// back off and retry until closed or out of attempts.
#[derive(Clone)]
pub(crate) struct ConnectionManager {
    inner: Arc<ConnectionManagerInner>,
}

impl ConnectionManager {
    /// Validates `endpoint` and starts connecting in the background.
    ///
    /// Returns immediately. The connection task runs on the current tokio
    /// runtime; without one this fails with [`FeedError::NoRuntime`].
    pub(crate) fn open(
        endpoint: &str,
        config: FeedConfig,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn FrameSink>,
        errors: ErrorChannel,
    ) -> Result<Self> {
        let endpoint = Endpoint::parse(endpoint)?;
        let runtime = Handle::try_current().map_err(|_| FeedError::NoRuntime)?;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        let inner = Arc::new(ConnectionManagerInner {
            endpoint,
            state_tx,
            cancel: CancellationToken::new(),
        });
        inner.transition(ConnectionState::Connecting);

        spawn_connection_loop(&runtime, inner.clone(), config, connector, sink, errors);

        Ok(Self { inner })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Stream of state changes, starting with the current state.
    pub fn state_changes(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.inner.state_tx.subscribe())
    }

    /// Stops the connection for good: cancels any pending retry or connect
    /// attempt and releases the transport. Returns false if already closed.
    pub fn close(&self) -> bool {
        let inner = &self.inner;
        let mut first = false;
        inner.state_tx.send_if_modified(|state| {
            if inner.cancel.is_cancelled() {
                return false;
            }
            inner.cancel.cancel();
            first = true;
            let changed = *state != ConnectionState::Disconnected;
            *state = ConnectionState::Disconnected;
            changed
        });
        if first {
            info!("connection to {} closed", inner.endpoint);
        }
        first
    }
}

enum SessionEnd {
    Cancelled,
    Lost(String),
}

fn spawn_connection_loop(
    runtime: &Handle,
    inner: Arc<ConnectionManagerInner>,
    config: FeedConfig,
    connector: Arc<dyn Connector>,
    sink: Arc<dyn FrameSink>,
    errors: ErrorChannel,
) {
    runtime.spawn(async move {
        let cancel = inner.cancel.clone();
        let endpoint = inner.endpoint.clone();
        let mut backoff = Backoff::from_config(&config);

        loop {
            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = connector.connect(&endpoint) => result,
            };

            match connected {
                Ok(mut transport) => {
                    if !inner.transition(ConnectionState::Connected) {
                        transport.close().await;
                        break;
                    }
                    backoff.reset();
                    info!("connected to {}", endpoint);

                    match run_session(
                        transport.as_mut(),
                        &cancel,
                        sink.as_ref(),
                        config.ping_interval,
                    )
                    .await
                    {
                        SessionEnd::Cancelled => {
                            transport.close().await;
                            break;
                        }
                        SessionEnd::Lost(reason) => {
                            warn!("connection to {} lost: {}", endpoint, reason);
                        }
                    }
                }
                Err(e) => {
                    warn!("connection to {} failed: {:#}", endpoint, e);
                }
            }

            match backoff.next_delay() {
                Some(delay) => {
                    let attempt = backoff.attempt();
                    if !inner.transition(ConnectionState::Reconnecting { attempt }) {
                        break;
                    }
                    info!(
                        "reconnecting to {} in {:?} (attempt {})",
                        endpoint, delay, attempt
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                }
                None => {
                    if inner.transition(ConnectionState::Disconnected) {
                        errors.report(&FeedError::GiveUp(backoff.attempt()));
                    }
                    break;
                }
            }
        }

        debug!("connection task for {} stopped", endpoint);
    });
}

async fn run_session(
    transport: &mut dyn Transport,
    cancel: &CancellationToken,
    sink: &dyn FrameSink,
    ping_interval: Duration,
) -> SessionEnd {
    // A zero interval disables keepalive pings.
    let mut ping_timer = (!ping_interval.is_zero())
        .then(|| tokio::time::interval_at(Instant::now() + ping_interval, ping_interval));

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            frame = transport.recv() => match frame {
                Some(Ok(bytes)) => sink.on_frame(&bytes),
                Some(Err(e)) => return SessionEnd::Lost(format!("{:#}", e)),
                None => return SessionEnd::Lost("closed by peer".to_string()),
            },
            _ = tick(&mut ping_timer) => {
                if let Err(e) = transport.ping().await {
                    return SessionEnd::Lost(format!("ping failed: {:#}", e));
                }
            }
        }
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
