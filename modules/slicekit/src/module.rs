//! Modules: one slice's initial value plus the action groups that own it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::action::{Action, Tag};
use crate::creators::ActionCreator;
use crate::error::{Result, SlicekitError};
use crate::group::{ActionEntry, PayloadShape};

/// A validated set of action groups sharing one state slice.
///
/// Every registration key equals the tag of the group registered under it,
/// and each tag appears once. Both are checked by [`ModuleBuilder::build`].
pub struct Module<S> {
    initial_state: Arc<S>,
    actions: HashMap<Tag, ActionEntry<S>>,
}

impl<S: Send + Sync + 'static> Module<S> {
    pub fn builder(initial_state: S) -> ModuleBuilder<S> {
        ModuleBuilder {
            initial_state,
            entries: Vec::new(),
        }
    }

    pub fn initial_state(&self) -> &Arc<S> {
        &self.initial_state
    }

    pub fn owns(&self, tag: &str) -> bool {
        self.actions.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> Vec<&Tag> {
        let mut tags: Vec<&Tag> = self.actions.keys().collect();
        tags.sort();
        tags
    }

    pub fn entry(&self, tag: &str) -> Option<&ActionEntry<S>> {
        self.actions.get(tag)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Apply `action` to `state`.
    ///
    /// Tags this module does not own return `state` itself, pointer-identical.
    /// That is how a slice ignores actions meant for other slices.
    pub fn reduce(&self, state: &Arc<S>, action: &Action) -> Result<Arc<S>> {
        match self.actions.get(action.tag().as_str()) {
            Some(entry) => Ok(Arc::new(entry.apply(state, action)?)),
            None => Ok(Arc::clone(state)),
        }
    }

    /// Payload type of every registered tag, sorted by tag.
    pub fn shapes(&self) -> Vec<PayloadShape> {
        let mut shapes: Vec<PayloadShape> =
            self.actions.values().map(ActionEntry::shape).collect();
        shapes.sort_by(|a, b| a.tag.cmp(&b.tag));
        shapes
    }

    pub fn creators(&self) -> Vec<ActionCreator> {
        self.actions
            .values()
            .map(|entry| entry.creator().clone())
            .collect()
    }
}

impl<S> Clone for Module<S> {
    fn clone(&self) -> Self {
        Self {
            initial_state: Arc::clone(&self.initial_state),
            actions: self.actions.clone(),
        }
    }
}

impl<S> fmt::Debug for Module<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.actions.keys().map(Tag::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("Module").field("tags", &tags).finish()
    }
}

/// Collects action groups for a module. Nothing is validated until
/// [`ModuleBuilder::build`], which fails on the first bad registration.
pub struct ModuleBuilder<S> {
    initial_state: S,
    entries: Vec<(String, ActionEntry<S>)>,
}

impl<S: Send + Sync + 'static> ModuleBuilder<S> {
    /// Register `group` under `key`. `key` must equal the group's tag.
    pub fn action(mut self, key: impl Into<String>, group: impl Into<ActionEntry<S>>) -> Self {
        self.entries.push((key.into(), group.into()));
        self
    }

    pub fn build(self) -> Result<Module<S>> {
        let actions = index_entries(self.entries)?;
        debug!(tags = actions.len(), "Module built");

        Ok(Module {
            initial_state: Arc::new(self.initial_state),
            actions,
        })
    }
}

fn index_entries<S>(
    entries: Vec<(String, ActionEntry<S>)>,
) -> Result<HashMap<Tag, ActionEntry<S>>> {
    let mut actions = HashMap::with_capacity(entries.len());

    for (key, entry) in entries {
        Tag::from(key.clone()).validate()?;

        if entry.tag().as_str() != key {
            return Err(SlicekitError::TagMismatch {
                key,
                tag: entry.tag().clone(),
            });
        }

        let tag = entry.tag().clone();
        if actions.insert(tag.clone(), entry).is_some() {
            return Err(SlicekitError::DuplicateTag(tag));
        }
    }

    Ok(actions)
}

/// Functional spelling of [`Module::builder`]: validates every
/// `(key, group)` pair and returns the module or the first error.
pub fn build_module<S, K, I>(initial_state: S, actions: I) -> Result<Module<S>>
where
    S: Send + Sync + 'static,
    K: Into<String>,
    I: IntoIterator<Item = (K, ActionEntry<S>)>,
{
    actions
        .into_iter()
        .fold(Module::builder(initial_state), |builder, (key, entry)| {
            builder.action(key, entry)
        })
        .build()
}
