use crate::registry::{Registry, SubscriptionHandle};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Coarse classification of everything the client can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidEndpoint,
    GiveUp,
    DecodeFailure,
    SubscriberPanic,
    Closed,
    NoRuntime,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidEndpoint => "invalid_endpoint",
            ErrorKind::GiveUp => "give_up",
            ErrorKind::DecodeFailure => "decode_failure",
            ErrorKind::SubscriberPanic => "subscriber_panic",
            ErrorKind::Closed => "closed",
            ErrorKind::NoRuntime => "no_runtime",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Gave up reconnecting after {0} attempts")]
    GiveUp(u32),

    #[error("Failed to decode frame: {0}")]
    DecodeFailure(String),

    #[error("Subscriber {handle} panicked: {message}")]
    SubscriberPanic {
        handle: SubscriptionHandle,
        message: String,
    },

    #[error("Client is closed")]
    Closed,

    #[error("No tokio runtime to run the connection task on")]
    NoRuntime,
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::InvalidEndpoint { .. } => ErrorKind::InvalidEndpoint,
            FeedError::GiveUp(_) => ErrorKind::GiveUp,
            FeedError::DecodeFailure(_) => ErrorKind::DecodeFailure,
            FeedError::SubscriberPanic { .. } => ErrorKind::SubscriberPanic,
            FeedError::Closed => ErrorKind::Closed,
            FeedError::NoRuntime => ErrorKind::NoRuntime,
        }
    }
}

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

/// What error observers receive: the kind plus a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<&FeedError> for ErrorEvent {
    fn from(error: &FeedError) -> Self {
        Self {
            kind: error.kind(),
            detail: error.to_string(),
        }
    }
}

/// Fan-out point for non-fatal and terminal errors, shared by the
/// connection task and the feed state.
#[derive(Clone, Default)]
pub(crate) struct ErrorChannel {
    observers: Arc<Registry<ErrorEvent>>,
}

impl ErrorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, callback: Arc<dyn Fn(&ErrorEvent) + Send + Sync>) -> SubscriptionHandle {
        self.observers.insert(callback)
    }

    pub fn remove(&self, handle: SubscriptionHandle) -> bool {
        self.observers.remove(handle)
    }

    pub fn report(&self, error: &FeedError) {
        let event = ErrorEvent::from(error);
        match event.kind {
            ErrorKind::GiveUp | ErrorKind::InvalidEndpoint | ErrorKind::NoRuntime => {
                tracing::error!(kind = %event.kind, "{}", event.detail)
            }
            _ => tracing::warn!(kind = %event.kind, "{}", event.detail),
        }

        // Observers must not feed back into the channel they are notified from.
        for (handle, message) in self.observers.notify(&event) {
            tracing::error!("error observer {} panicked: {}", handle, message);
        }
    }

    pub fn clear(&self) {
        self.observers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(FeedError::GiveUp(3).kind(), ErrorKind::GiveUp);
        assert_eq!(FeedError::Closed.kind(), ErrorKind::Closed);
        assert_eq!(
            FeedError::DecodeFailure("eof".into()).kind(),
            ErrorKind::DecodeFailure
        );
    }

    #[test]
    fn test_report_reaches_every_observer() {
        let channel = ErrorChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let seen = seen.clone();
            channel.observe(Arc::new(move |event: &ErrorEvent| {
                seen.lock().unwrap().push(event.clone());
            }));
        }

        channel.report(&FeedError::DecodeFailure("bad frame".into()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|e| e.kind == ErrorKind::DecodeFailure));
        assert!(seen[0].detail.contains("bad frame"));
    }

    #[test]
    fn test_panicking_observer_does_not_stop_others() {
        let channel = ErrorChannel::new();
        let seen = Arc::new(Mutex::new(0));

        channel.observe(Arc::new(|_: &ErrorEvent| panic!("observer bug")));
        let counter = seen.clone();
        channel.observe(Arc::new(move |_: &ErrorEvent| {
            *counter.lock().unwrap() += 1;
        }));

        channel.report(&FeedError::GiveUp(5));
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
