//! The global state container: one type-erased value per slice.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One slice's current value.
pub type SliceValue = Arc<dyn Any + Send + Sync>;

/// Flat mapping from slice name to that slice's state.
///
/// Only the combined reducer builds new values of this type; everything else
/// reads it through the typed accessors.
#[derive(Clone, Default)]
pub struct GlobalState {
    slices: BTreeMap<String, SliceValue>,
}

impl GlobalState {
    pub(crate) fn from_slices(slices: BTreeMap<String, SliceValue>) -> Self {
        Self { slices }
    }

    /// Borrow slice `name` as `T`. `None` if absent or of another type.
    pub fn slice<T: Any>(&self, name: &str) -> Option<&T> {
        (**self.slices.get(name)?).downcast_ref::<T>()
    }

    /// Shared handle to slice `name` as `T`.
    pub fn slice_arc<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        Arc::clone(self.slices.get(name)?).downcast::<T>().ok()
    }

    pub fn raw(&self, name: &str) -> Option<&SliceValue> {
        self.slices.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slices.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// True when both states hold the very same allocation for `name`.
    pub fn same_slice(&self, other: &GlobalState, name: &str) -> bool {
        match (self.slices.get(name), other.slices.get(name)) {
            (Some(a), Some(b)) => same_value(a, b),
            _ => false,
        }
    }
}

pub(crate) fn same_value(a: &SliceValue, b: &SliceValue) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl fmt::Debug for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalState")
            .field("slices", &self.slices.keys().collect::<Vec<_>>())
            .finish()
    }
}
