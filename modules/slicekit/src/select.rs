//! Change-suppressing selectors.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::state::GlobalState;

type SelectFn<T> = Box<dyn Fn(&GlobalState) -> T + Send + Sync>;
type EqualsFn<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Derives a value from global state and remembers the last value it
/// delivered, so callers only hear about real changes.
pub struct Selector<T> {
    select: SelectFn<T>,
    equals: EqualsFn<T>,
    last: Mutex<Option<T>>,
}

impl<T: PartialEq + Send + 'static> Selector<T> {
    /// Selector comparing derived values with `PartialEq`.
    pub fn new(select: impl Fn(&GlobalState) -> T + Send + Sync + 'static) -> Self {
        Self::with_equality(select, |prev: &T, cur: &T| prev == cur)
    }
}

impl<T: Send + 'static> Selector<T> {
    /// Selector with a caller-supplied comparison. `equals(prev, cur)`
    /// returning true suppresses delivery of `cur`.
    pub fn with_equality(
        select: impl Fn(&GlobalState) -> T + Send + Sync + 'static,
        equals: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            select: Box::new(select),
            equals: Box::new(equals),
            last: Mutex::new(None),
        }
    }

    /// Run the selector once against `state` without touching the
    /// remembered value.
    pub fn evaluate(&self, state: &GlobalState) -> T {
        (self.select)(state)
    }
}

impl<T: Clone + Send + 'static> Selector<T> {
    /// Evaluate once against `state`. Returns the derived value when it
    /// differs from the last delivered one (or nothing was delivered yet),
    /// and remembers it as delivered.
    pub fn poll(&self, state: &GlobalState) -> Option<T> {
        let current = (self.select)(state);
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(prev) = last.as_ref() {
            if (self.equals)(prev, &current) {
                return None;
            }
        }
        *last = Some(current.clone());
        Some(current)
    }

    /// The last delivered value.
    pub fn last(&self) -> Option<T> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector").finish_non_exhaustive()
    }
}
