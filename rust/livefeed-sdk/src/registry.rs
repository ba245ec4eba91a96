use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Opaque token returned at registration time, used to remove the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionHandle(u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle-keyed set of callbacks.
///
/// Iteration follows handle order, which is registration order, so a
/// notification pass visits callbacks deterministically.
pub(crate) struct Registry<E> {
    next_id: AtomicU64,
    callbacks: Mutex<BTreeMap<SubscriptionHandle, Callback<E>>>,
}

impl<E> Registry<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn insert(&self, callback: Callback<E>) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(handle, callback);
        handle
    }

    /// Returns false when the handle was not (or no longer) registered.
    pub fn remove(&self, handle: SubscriptionHandle) -> bool {
        self.lock().remove(&handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Invokes every callback registered at call time.
    ///
    /// The lock is released before any callback runs, so callbacks may
    /// register or remove entries. Panics are caught and returned with the
    /// offending handle; the pass continues with the next callback.
    pub fn notify(&self, event: &E) -> Vec<(SubscriptionHandle, String)> {
        let snapshot: Vec<(SubscriptionHandle, Callback<E>)> = self
            .lock()
            .iter()
            .map(|(handle, cb)| (*handle, cb.clone()))
            .collect();

        let mut panics = Vec::new();
        for (handle, callback) in snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
                panics.push((handle, panic_message(payload.as_ref())));
            }
        }
        panics
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<SubscriptionHandle, Callback<E>>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
