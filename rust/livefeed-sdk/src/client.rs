use crate::config::FeedConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::decode::{Decode, JsonDecoder};
use crate::endpoint::Endpoint;
use crate::error::{ErrorChannel, ErrorEvent, FeedError, Result};
use crate::feed::{FeedState, Payload, PayloadStream};
use crate::registry::SubscriptionHandle;
use crate::transport::{Connector, WsConnector};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;

/// A live feed: one connection, one latest payload, many subscribers.
///
/// Dropping the client closes it.
pub struct FeedClient<T = Value> {
    connection: ConnectionManager,
    feed: FeedState<T>,
    errors: ErrorChannel,
}

impl<T> FeedClient<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Opens a JSON feed with the given configuration.
    pub fn open(endpoint: impl Into<String>, config: FeedConfig) -> Result<Self> {
        Self::builder(endpoint).config(config).open()
    }

    pub fn builder(endpoint: impl Into<String>) -> FeedClientBuilder<T> {
        FeedClientBuilder::new(endpoint, JsonDecoder::<T>::new())
    }
}

impl<T> FeedClient<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Closes the connection, drops all subscribers and error observers and
    /// ends every watch stream. Returns false if already closed.
    pub fn close(&self) -> bool {
        let closed_connection = self.connection.close();
        let closed_feed = self.feed.close();
        self.errors.clear();
        closed_connection || closed_feed
    }

    pub fn is_closed(&self) -> bool {
        self.feed.is_closed()
    }

    pub fn subscribe<F>(&self, callback: F) -> Result<SubscriptionHandle>
    where
        F: Fn(&Payload<T>) + Send + Sync + 'static,
    {
        self.feed.subscribe(callback)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        self.feed.unsubscribe(handle)
    }

    pub fn latest(&self) -> Option<Payload<T>> {
        self.feed.latest()
    }

    pub fn watch(&self) -> Result<PayloadStream<T>> {
        self.feed.watch()
    }

    /// Registers an observer for reported errors.
    pub fn on_error<F>(&self, callback: F) -> Result<SubscriptionHandle>
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(FeedError::Closed);
        }
        Ok(self.errors.observe(Arc::new(callback)))
    }

    pub fn remove_error_observer(&self, handle: SubscriptionHandle) -> Result<()> {
        if self.is_closed() {
            return Err(FeedError::Closed);
        }
        self.errors.remove(handle);
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn state_changes(&self) -> WatchStream<ConnectionState> {
        self.connection.state_changes()
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.connection.endpoint()
    }

    /// Direct access to the feed state, e.g. to hand a clone to another task.
    pub fn feed(&self) -> &FeedState<T> {
        &self.feed
    }
}

impl<T> Drop for FeedClient<T> {
    fn drop(&mut self) {
        self.connection.close();
    }
}

pub struct FeedClientBuilder<T> {
    endpoint: String,
    config: FeedConfig,
    decoder: Box<dyn Decode<T>>,
    connector: Arc<dyn Connector>,
    errors: ErrorChannel,
}

impl<T> FeedClientBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Builder for payload types that are not JSON-deserializable.
    pub fn new(endpoint: impl Into<String>, decoder: impl Decode<T>) -> Self {
        Self {
            endpoint: endpoint.into(),
            config: FeedConfig::default(),
            decoder: Box::new(decoder),
            connector: Arc::new(WsConnector),
            errors: ErrorChannel::new(),
        }
    }

    pub fn config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = Some(attempts);
        self
    }

    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = interval;
        self
    }

    pub fn decoder(mut self, decoder: impl Decode<T>) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Registers an error observer before opening, so it also sees an
    /// invalid endpoint.
    pub fn on_error<F>(self, callback: F) -> Self
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        self.errors.observe(Arc::new(callback));
        self
    }

    /// Validates the endpoint and starts connecting in the background on
    /// the current tokio runtime. Fails with `NoRuntime` outside of one.
    pub fn open(self) -> Result<FeedClient<T>> {
        let feed = FeedState::new(self.decoder, self.errors.clone(), self.config.update_buffer);

        let connection = match ConnectionManager::open(
            &self.endpoint,
            self.config,
            self.connector,
            Arc::new(feed.clone()),
            self.errors.clone(),
        ) {
            Ok(connection) => connection,
            Err(e) => {
                self.errors.report(&e);
                return Err(e);
            }
        };

        Ok(FeedClient {
            connection,
            feed,
            errors: self.errors,
        })
    }
}
