// src/listeners.rs

//! Observers of limiting-state transitions.

// dependencies
use dashmap::DashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Handle returned by [`RateLimiter::add_listener`](crate::RateLimiter::add_listener),
/// used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

/// Registry of transition listeners keyed by a stable id.
/// Registration and removal never take the scheduler state lock.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: DashMap<ListenerId, Listener>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, Arc::new(listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Call every listener with the new limiting state, in registration order.
    pub(crate) fn notify(&self, limiting: bool) {
        // clone out of the map so listeners may (de)register themselves
        let mut listeners: Vec<(ListenerId, Listener)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        listeners.sort_by_key(|(id, _)| id.0);

        for (id, listener) in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(limiting))).is_err() {
                warn!(listener = id.0, limiting, "ListenerRegistry::notify: listener panicked");
            }
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
