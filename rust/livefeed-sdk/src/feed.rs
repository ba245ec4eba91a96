//! Latest-value store with subscriber fan-out.

use crate::connection::FrameSink;
use crate::decode::Decode;
use crate::error::{ErrorChannel, FeedError, Result};
use crate::registry::{Registry, SubscriptionHandle};
use futures_util::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// The most recent decoded message and the sequence number it was assigned
/// on receipt. Sequence numbers start at 1 and are never taken from the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload<T> {
    pub value: T,
    pub sequence: u64,
}

struct FeedInner<T> {
    decoder: Box<dyn Decode<T>>,
    /// Held for the whole of a dispatch so two notification passes never
    /// interleave.
    dispatch: Mutex<()>,
    sequence: AtomicU64,
    latest: RwLock<Option<Payload<T>>>,
    subscribers: Registry<Payload<T>>,
    updates_tx: Mutex<Option<broadcast::Sender<Payload<T>>>>,
    errors: ErrorChannel,
    closed: AtomicBool,
}

/// Owns the latest payload and the subscribers notified on every update.
///
/// Cloning is cheap and yields another handle to the same state.
pub struct FeedState<T> {
    inner: Arc<FeedInner<T>>,
}

impl<T> Clone for FeedState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> FeedState<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(decoder: Box<dyn Decode<T>>, errors: ErrorChannel, update_buffer: usize) -> Self {
        let (updates_tx, _) = broadcast::channel(update_buffer.max(1));
        Self {
            inner: Arc::new(FeedInner {
                decoder,
                dispatch: Mutex::new(()),
                sequence: AtomicU64::new(0),
                latest: RwLock::new(None),
                subscribers: Registry::new(),
                updates_tx: Mutex::new(Some(updates_tx)),
                errors,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Registers `callback` for every future payload.
    pub fn subscribe<F>(&self, callback: F) -> Result<SubscriptionHandle>
    where
        F: Fn(&Payload<T>) + Send + Sync + 'static,
    {
        self.ensure_open()?;
        let handle = self.inner.subscribers.insert(Arc::new(callback));
        tracing::debug!("subscriber {} registered", handle);
        Ok(handle)
    }

    /// Removes a registration. Unknown or already removed handles are a no-op.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        self.ensure_open()?;
        if self.inner.subscribers.remove(handle) {
            tracing::debug!("subscriber {} removed", handle);
        }
        Ok(())
    }

    /// Current payload, `None` until the first frame decodes. Keeps working
    /// after close.
    pub fn latest(&self) -> Option<Payload<T>> {
        self.inner
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of payloads accepted so far.
    pub fn sequence(&self) -> u64 {
        self.inner.sequence.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Stream of future payloads. Slow consumers skip what they missed
    /// rather than stalling the feed; the stream ends when the feed closes.
    pub fn watch(&self) -> Result<PayloadStream<T>> {
        self.ensure_open()?;
        let guard = self
            .inner
            .updates_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => Ok(PayloadStream::new(tx.subscribe())),
            None => Err(FeedError::Closed),
        }
    }

    /// Decodes one raw frame, stores it under the next sequence number and
    /// notifies every subscriber before returning.
    ///
    /// Normally driven by the connection task. Must not be called from
    /// inside a subscriber callback.
    pub fn on_raw_message(&self, frame: &[u8]) -> Result<u64> {
        self.ensure_open()?;
        let _dispatch = self.lock_dispatch();
        self.ensure_open()?;

        let value = match self.inner.decoder.decode(frame) {
            Ok(value) => value,
            Err(e) => {
                let error = FeedError::DecodeFailure(format!("{:#}", e));
                self.inner.errors.report(&error);
                return Err(error);
            }
        };

        let sequence = self.inner.sequence.load(Ordering::SeqCst) + 1;
        self.inner.sequence.store(sequence, Ordering::SeqCst);
        let payload = Payload { value, sequence };

        *self
            .inner
            .latest
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(payload.clone());

        tracing::debug!(
            sequence = payload.sequence,
            subscribers = self.inner.subscribers.len(),
            "payload accepted"
        );

        for (handle, message) in self.inner.subscribers.notify(&payload) {
            self.inner
                .errors
                .report(&FeedError::SubscriberPanic { handle, message });
        }

        if let Some(tx) = self
            .inner
            .updates_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = tx.send(payload);
        }

        Ok(sequence)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Drops every subscriber and ends all watch streams. Returns false if
    /// the feed was already closed.
    pub(crate) fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.subscribers.clear();
        self.inner
            .updates_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(FeedError::Closed)
        } else {
            Ok(())
        }
    }

    fn lock_dispatch(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> FrameSink for FeedState<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn on_frame(&self, frame: &[u8]) {
        // Decode failures are already reported through the error channel.
        let _ = self.on_raw_message(frame);
    }
}

/// Stream returned by [`FeedState::watch`].
pub struct PayloadStream<T> {
    inner: BroadcastStream<Payload<T>>,
}

impl<T: Clone + Send + 'static> PayloadStream<T> {
    fn new(rx: broadcast::Receiver<Payload<T>>) -> Self {
        Self {
            inner: BroadcastStream::new(rx),
        }
    }
}

impl<T: Clone + Send + 'static> Stream for PayloadStream<T> {
    type Item = Payload<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(payload))) => return Poll::Ready(Some(payload)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::debug!("watch stream lagged, skipped {} payloads", skipped);
                    continue;
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
