//! Middleware implementations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::listeners::lock;
use crate::traits::{ActionLike, Middleware};

// ---------------------------------------------------------------------------
// ActionRecorder (in-memory dispatch history)
// ---------------------------------------------------------------------------

/// One dispatch as seen by an [`ActionRecorder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    pub seq: i64,
    pub ts: DateTime<Utc>,
    pub tag: String,
    pub payload: serde_json::Value,
    /// False when the reducer handed back the previous state untouched.
    pub changed: bool,
}

/// Records every committed dispatch with an incrementing sequence number.
/// Thread-safe. With a capacity set, the oldest entries are dropped first.
pub struct ActionRecorder {
    next_seq: AtomicI64,
    capacity: Option<usize>,
    entries: Mutex<VecDeque<RecordedAction>>,
}

impl ActionRecorder {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicI64::new(1),
            capacity: None,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> Vec<RecordedAction> {
        lock(&self.entries).iter().cloned().collect()
    }

    /// Tags of the retained entries, oldest first.
    pub fn tags(&self) -> Vec<String> {
        lock(&self.entries).iter().map(|e| e.tag.clone()).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    fn record(&self, tag: String, payload: serde_json::Value, changed: bool) {
        let entry = RecordedAction {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            ts: Utc::now(),
            tag,
            payload,
            changed,
        };

        let mut entries = lock(&self.entries);
        if self.capacity == Some(0) {
            return;
        }
        if let Some(capacity) = self.capacity {
            while entries.len() >= capacity {
                entries.pop_front();
            }
        }
        entries.push_back(entry);
    }
}

impl Default for ActionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ActionLike, S> Middleware<A, S> for ActionRecorder {
    fn after_dispatch(&self, action: &A, prev: &Arc<S>, next: &Arc<S>) {
        self.record(
            action.tag().to_string(),
            action.to_payload(),
            !Arc::ptr_eq(prev, next),
        );
    }
}

// ---------------------------------------------------------------------------
// LoggingMiddleware (tracing)
// ---------------------------------------------------------------------------

/// Emits one `debug` event per dispatch, tagged with the store name.
pub struct LoggingMiddleware {
    store: String,
}

impl LoggingMiddleware {
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
        }
    }
}

impl<A: ActionLike, S> Middleware<A, S> for LoggingMiddleware {
    fn on_create(&self, _state: &S) -> Result<()> {
        debug!(store = %self.store, "Dispatch logging enabled");
        Ok(())
    }

    fn after_dispatch(&self, action: &A, prev: &Arc<S>, next: &Arc<S>) {
        debug!(
            store = %self.store,
            tag = action.tag(),
            changed = !Arc::ptr_eq(prev, next),
            "Dispatch"
        );
    }
}
