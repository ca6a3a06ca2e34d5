//! Listener registry and subscription handles.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerTable<T> {
    next_id: u64,
    listeners: BTreeMap<u64, Listener<T>>,
}

/// Set of callbacks interested in values of type `T`.
///
/// Cloning yields another handle to the same set.
pub struct ListenerSet<T> {
    table: Arc<Mutex<ListenerTable<T>>>,
}

impl<T> Clone for ListenerSet<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            table: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                listeners: BTreeMap::new(),
            })),
        }
    }
}

impl<T: 'static> ListenerSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one listener and returns its cancellation handle.
    pub fn add<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            let id = table.next_id;
            table.next_id += 1;
            table.listeners.insert(id, Arc::new(listener));
            id
        };

        let weak: Weak<Mutex<ListenerTable<T>>> = Arc::downgrade(&self.table);
        Subscription::from_fn(move || {
            if let Some(table) = weak.upgrade() {
                table
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .remove(&id);
            }
        })
    }

    /// Delivers `value` to every listener registered at call time.
    ///
    /// The listener list is snapshotted first, so listeners may register or
    /// cancel subscriptions from inside their callback.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = {
            let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.listeners.values().cloned().collect()
        };
        for listener in snapshot {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cancellation handle for one live registration.
///
/// `unsubscribe()` stops further deliveries. Dropping the handle cancels as
/// well, so keep it alive for as long as updates are wanted.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wraps a cancellation closure that runs at most once.
    pub fn from_fn<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stops further deliveries. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
