//! Shared preferences store.
//!
//! # Responsibility
//! - Hold one fully merged [`PreferenceDocument`] for the whole app.
//! - Apply local patches optimistically and persist them in the background
//!   of the caller's flow.
//! - Mirror remote changes of the stored document to local observers.
//!
//! # Invariants
//! - Observers only ever see complete documents merged over defaults.
//! - A local patch reaches observers before the write is attempted.
//! - A failed write is logged and never rolled back or returned.
//! - Store failures on read degrade to defaults.
//! - `updated_at` strictly increases across writes from this process.
//! - Writes reach the store in commit order, and each one carries the
//!   latest local document.
//! - A remote snapshot older than the local document is ignored.

use crate::model::preferences::{PreferenceDocument, PreferencePatch};
use crate::model::records::APP_META;
use crate::store::{Document, DocumentStore, SetMode, StoreResult};
use crate::service::now_ms;
use crate::sync::{ListenerSet, Subscription};
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Document id of the settings record inside `appMeta`.
pub const SETTINGS_ID: &str = "settings";

struct PrefsInner {
    store: Arc<dyn DocumentStore>,
    current: Mutex<PreferenceDocument>,
    // Held across each store write; never while notifying for a local commit.
    write_order: Mutex<()>,
    listeners: ListenerSet<PreferenceDocument>,
}

impl PrefsInner {
    fn snapshot(&self) -> PreferenceDocument {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adopts a remote document and notifies when it changed.
    fn replace(&self, next: PreferenceDocument) {
        let changed = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == next || is_stale(next.updated_at, current.updated_at) {
                false
            } else {
                *current = next.clone();
                true
            }
        };
        if changed {
            self.listeners.notify(&next);
        }
    }

    /// Applies `edit` to the local document, stamps it and publishes it.
    fn commit_local<F>(&self, edit: F) -> PreferenceDocument
    where
        F: FnOnce(&PreferenceDocument) -> PreferenceDocument,
    {
        let next = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            let mut next = edit(&current);
            next.updated_at = Some(next_updated_at(current.updated_at, now_ms()));
            *current = next.clone();
            next
        };
        self.listeners.notify(&next);
        next
    }

    /// Writes the latest local document.
    fn persist(&self, op: &str) {
        let _order = self.write_order.lock().unwrap_or_else(PoisonError::into_inner);
        let document = self.snapshot();
        match self
            .store
            .set(APP_META, SETTINGS_ID, document.to_json_map(), SetMode::Overwrite)
        {
            Ok(()) => info!("event=prefs_write module=preferences status=ok op={op}"),
            Err(err) => {
                warn!("event=prefs_write module=preferences status=error op={op} error={err}")
            }
        }
    }

    fn create_defaults(&self) -> PreferenceDocument {
        let defaults = self.commit_local(|_| PreferenceDocument::default());
        self.persist("create_defaults");
        defaults
    }

    fn on_remote(&self, snapshot: StoreResult<Option<Document>>) {
        match snapshot {
            Ok(Some(doc)) => self.replace(PreferenceDocument::from_stored(&doc.data)),
            Ok(None) => {
                self.create_defaults();
            }
            Err(err) => {
                warn!("event=prefs_remote module=preferences status=degraded error={err}");
            }
        }
    }
}

/// A remote document is stale when both sides are stamped and it is older.
fn is_stale(remote: Option<i64>, local: Option<i64>) -> bool {
    matches!((remote, local), (Some(remote), Some(local)) if remote < local)
}

/// Next `updated_at`: wall clock, or one past `previous` when the clock
/// did not advance.
fn next_updated_at(previous: Option<i64>, now: i64) -> i64 {
    match previous {
        Some(previous) if previous >= now => previous.saturating_add(1),
        _ => now,
    }
}

/// Process-wide preferences store.
///
/// Create one with [`PreferencesStore::open`] at startup and share it.
/// Dropping it, or calling [`PreferencesStore::close`], releases the
/// backing document subscription.
pub struct PreferencesStore {
    inner: Arc<PrefsInner>,
    remote: Mutex<Option<Subscription>>,
}

impl PreferencesStore {
    /// Starts mirroring the stored settings document.
    ///
    /// Never fails: when the store cannot be subscribed to, the store keeps
    /// serving defaults and local patches.
    pub fn open(store: Arc<dyn DocumentStore>) -> Self {
        let inner = Arc::new(PrefsInner {
            store: Arc::clone(&store),
            current: Mutex::new(PreferenceDocument::default()),
            write_order: Mutex::new(()),
            listeners: ListenerSet::new(),
        });

        let weak: Weak<PrefsInner> = Arc::downgrade(&inner);
        let remote = match store.subscribe_doc(
            APP_META,
            SETTINGS_ID,
            Box::new(move |snapshot| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_remote(snapshot);
                }
            }),
        ) {
            Ok(subscription) => {
                info!("event=prefs_open module=preferences status=ok");
                Some(subscription)
            }
            Err(err) => {
                warn!("event=prefs_open module=preferences status=degraded error={err}");
                None
            }
        };

        Self {
            inner,
            remote: Mutex::new(remote),
        }
    }

    /// Fetches the stored document merged over defaults.
    ///
    /// Creates the stored record with defaults when it does not exist yet.
    /// Returns pure defaults when the store fails.
    pub fn read(&self) -> PreferenceDocument {
        match self.inner.store.get(APP_META, SETTINGS_ID) {
            Ok(Some(doc)) => PreferenceDocument::from_stored(&doc.data),
            Ok(None) => self.inner.create_defaults(),
            Err(err) => {
                warn!("event=prefs_read module=preferences status=degraded error={err}");
                PreferenceDocument::default()
            }
        }
    }

    /// Locally held document.
    pub fn current(&self) -> PreferenceDocument {
        self.inner.snapshot()
    }

    /// Invokes `on_change` with the current document, then after every
    /// local patch or remote change.
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(&PreferenceDocument) + Send + Sync + 'static,
    {
        let on_change = Arc::new(on_change);
        let listener = Arc::clone(&on_change);
        let subscription = self.inner.listeners.add(move |doc| listener(doc));
        on_change(&self.inner.snapshot());
        subscription
    }

    /// Merges `patch` into the local document, publishes it, then writes
    /// the whole merged document.
    pub fn patch(&self, patch: &PreferencePatch) -> PreferenceDocument {
        let sections = patch
            .sections()
            .into_iter()
            .map(|section| section.as_str())
            .collect::<Vec<_>>()
            .join(",");
        info!("event=prefs_patch module=preferences status=start sections={sections}");
        let next = self.inner.commit_local(|current| current.merged(patch));
        self.inner.persist("patch");
        next
    }

    /// Replaces the whole document unconditionally.
    pub fn save(&self, document: PreferenceDocument) -> PreferenceDocument {
        let next = self.inner.commit_local(|_| document);
        self.inner.persist("save");
        next
    }

    /// Stops mirroring remote changes. Idempotent.
    pub fn close(&self) {
        let remote = self
            .remote
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut subscription) = remote {
            subscription.unsubscribe();
            info!("event=prefs_close module=preferences status=ok");
        }
    }

    pub fn is_live(&self) -> bool {
        self.remote
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{is_stale, next_updated_at};

    #[test]
    fn updated_at_follows_clock_when_it_advances() {
        assert_eq!(next_updated_at(None, 1_000), 1_000);
        assert_eq!(next_updated_at(Some(900), 1_000), 1_000);
    }

    #[test]
    fn updated_at_never_repeats_or_goes_back() {
        assert_eq!(next_updated_at(Some(1_000), 1_000), 1_001);
        assert_eq!(next_updated_at(Some(5_000), 1_000), 5_001);
    }

    #[test]
    fn only_older_stamped_snapshots_are_stale() {
        assert!(is_stale(Some(10), Some(11)));
        assert!(!is_stale(Some(11), Some(11)));
        assert!(!is_stale(Some(12), Some(11)));
        assert!(!is_stale(None, Some(11)));
        assert!(!is_stale(Some(10), None));
    }
}
