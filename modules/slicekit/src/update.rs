//! Immutable-update helpers for transitions.
//!
//! Each helper builds a new collection from the old one; the input is never
//! modified.

use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Copy of `map` with `key` set to `value`.
pub fn with_entry<K, V>(map: &BTreeMap<K, V>, key: K, value: V) -> BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    let mut next = map.clone();
    next.insert(key, value);
    next
}

/// Copy of `map` without `key`. Absent keys yield an equal copy.
pub fn without_entry<K, V, Q>(map: &BTreeMap<K, V>, key: &Q) -> BTreeMap<K, V>
where
    K: Ord + Clone + Borrow<Q>,
    V: Clone,
    Q: Ord + ?Sized,
{
    map.iter()
        .filter(|(k, _)| <K as Borrow<Q>>::borrow(k) != key)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Copy of `items` with `item` pushed on the end.
pub fn appended<T: Clone>(items: &[T], item: T) -> Vec<T> {
    let mut next = Vec::with_capacity(items.len() + 1);
    next.extend_from_slice(items);
    next.push(item);
    next
}

/// Copy of `items` with position `index` replaced. `None` if out of range.
pub fn replaced_at<T: Clone>(items: &[T], index: usize, item: T) -> Option<Vec<T>> {
    if index >= items.len() {
        return None;
    }
    let mut next = items.to_vec();
    next[index] = item;
    Some(next)
}
