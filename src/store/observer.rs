//! Ordered observer registry
//!
//! Listeners are invoked synchronously, in registration order, with each new
//! snapshot. A notification round works on a copy of the registration list,
//! so a listener registered during a round is first called on the next one,
//! while a listener removed during a round is skipped for the rest of it.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Callback invoked with every new snapshot
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Registry of listeners for snapshots of type `T`
pub struct Observers<T> {
    inner: Mutex<Registry<T>>,
}

struct Registry<T> {
    next_id: u64,
    entries: Vec<(ListenerId, Listener<T>)>,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Observers<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Registry {
                next_id: 1,
                entries: Vec::new(),
            }),
        }
    }

    /// Register a listener at the end of the notification order
    pub fn register(&self, listener: Listener<T>) -> ListenerId {
        let mut registry = self.inner.lock();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push((id, listener));
        id
    }

    /// Remove a listener; returns false if it was already gone
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut registry = self.inner.lock();
        let before = registry.entries.len();
        registry.entries.retain(|(entry, _)| *entry != id);
        registry.entries.len() != before
    }

    /// Whether `id` is still registered
    pub fn contains(&self, id: ListenerId) -> bool {
        self.inner.lock().entries.iter().any(|(entry, _)| *entry == id)
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True if nobody is listening
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `value` to every listener registered when the round starts.
    ///
    /// The registry lock is released while listeners run, so they may
    /// subscribe or unsubscribe (including themselves).
    pub fn notify(&self, value: &T) {
        let round: Vec<(ListenerId, Listener<T>)> = self.inner.lock().entries.clone();
        for (id, listener) in round {
            if self.contains(id) {
                listener(value);
            }
        }
    }
}

/// Handle returned by `subscribe`; call [`Subscription::unsubscribe`] to stop
/// receiving notifications.
///
/// Dropping the handle does not unsubscribe, matching the usual
/// "returns an unsubscribe function" contract.
pub struct Subscription<T> {
    id: ListenerId,
    observers: Weak<Observers<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(id: ListenerId, observers: &Arc<Observers<T>>) -> Self {
        Self {
            id,
            observers: Arc::downgrade(observers),
        }
    }

    /// Registration id
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Stop receiving notifications. Idempotent; returns true on the call
    /// that actually removed the listener.
    pub fn unsubscribe(&self) -> bool {
        match self.observers.upgrade() {
            Some(observers) => observers.remove(self.id),
            None => false,
        }
    }

    /// Whether the listener is still registered
    pub fn is_active(&self) -> bool {
        self.observers
            .upgrade()
            .map(|observers| observers.contains(self.id))
            .unwrap_or(false)
    }
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            observers: Weak::clone(&self.observers),
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
