//! Observer registries backing the engine's notification channels
//!
//! Each notification channel is an [`Emitter`]: subscribing returns a
//! disposable [`EventSubscription`], delivery is synchronous fan-out in
//! subscription insertion order on the firing context, and disposal is
//! idempotent. Nothing is delivered across process restarts.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Listener<T> = Box<dyn Fn(&T) + Send + 'static>;

struct Registry<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// A single notification channel.
///
/// Listeners run synchronously on the firing context and must not subscribe
/// or dispose from inside the callback.
pub struct Emitter<T> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Emitter<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener. Delivery order is subscription insertion order.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + 'static) -> EventSubscription {
        let mut registry = lock(&self.inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Box::new(listener)));
        drop(registry);

        let weak = Arc::downgrade(&self.inner);
        EventSubscription {
            dispose: Some(Box::new(move || unsubscribe(&weak, id))),
        }
    }

    /// Synchronously deliver `value` to every live listener, in order.
    pub fn fire(&self, value: &T) {
        let registry = lock(&self.inner);
        for (_, listener) in &registry.listeners {
            listener(value);
        }
    }

    /// Number of live subscriptions on this channel.
    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

fn lock<T>(inner: &Arc<Mutex<Registry<T>>>) -> MutexGuard<'_, Registry<T>> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn unsubscribe<T>(weak: &Weak<Mutex<Registry<T>>>, id: u64) {
    if let Some(inner) = weak.upgrade() {
        lock(&inner).listeners.retain(|(entry, _)| *entry != id);
    }
}

/// Handle to a single subscription on an [`Emitter`].
///
/// Dropping the handle cancels delivery; [`dispose`](Self::dispose) does the
/// same explicitly and is safe to call more than once.
pub struct EventSubscription {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl EventSubscription {
    /// Cancel delivery. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("live", &self.dispose.is_some())
            .finish()
    }
}
