//! Listener registry and subscription handles.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Called after every committed dispatch with the state that was committed.
pub type Listener<S> = Arc<dyn Fn(&Arc<S>) + Send + Sync>;

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// Every value guarded in this crate is replaced wholesale, never left
/// half-written, so a poisoned lock still holds a consistent value.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

trait Registry: Send + Sync {
    fn remove(&self, id: u64) -> bool;
    fn contains(&self, id: u64) -> bool;
}

struct Entry<S> {
    /// Commits up to and including this sequence number predate the listener.
    since: u64,
    listener: Listener<S>,
}

/// Ordered set of listeners. Notification order is registration order.
pub struct Listeners<S> {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<u64, Entry<S>>>,
}

impl<S: Send + Sync + 'static> Listeners<S> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(BTreeMap::new()),
        })
    }

    /// Register `listener` for commits numbered above `since`.
    pub fn add(self: &Arc<Self>, listener: Listener<S>, since: u64) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.entries).insert(id, Entry { since, listener });
        let registry: Weak<dyn Registry> = Arc::downgrade(self) as Weak<dyn Registry>;
        Subscription { id, registry }
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every listener registered at the moment of the call whose
    /// `since` is below `seq`.
    ///
    /// The set is snapshotted first, so listeners may subscribe, unsubscribe
    /// or dispatch without deadlocking. Changes apply to the next notification.
    pub fn notify(&self, state: &Arc<S>, seq: u64) {
        let snapshot: Vec<Listener<S>> = lock(&self.entries)
            .values()
            .filter(|entry| entry.since < seq)
            .map(|entry| Arc::clone(&entry.listener))
            .collect();
        for listener in snapshot {
            listener(state);
        }
    }

    /// Notify the single listener `id`, if it is still registered.
    pub fn notify_one(&self, id: u64, state: &Arc<S>) {
        let listener = lock(&self.entries)
            .get(&id)
            .map(|entry| Arc::clone(&entry.listener));
        if let Some(listener) = listener {
            listener(state);
        }
    }
}

impl<S: Send + Sync + 'static> Registry for Listeners<S> {
    fn remove(&self, id: u64) -> bool {
        lock(&self.entries).remove(&id).is_some()
    }

    fn contains(&self, id: u64) -> bool {
        lock(&self.entries).contains_key(&id)
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener registered;
/// call [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Registry>,
}

impl Subscription {
    /// Remove the listener. Returns `false` if it was already removed or the
    /// engine is gone.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.remove(self.id))
            .unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.contains(self.id))
            .unwrap_or(false)
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
