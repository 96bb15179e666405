//! Slice reducers and the combined reducer that fans a dispatch out to them.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use slicekit_engine::Reducer;
use tracing::{trace, warn};

use crate::action::Action;
use crate::creators::ActionCreator;
use crate::error::{Result, SlicekitError};
use crate::group::PayloadShape;
use crate::module::Module;
use crate::state::{same_value, GlobalState, SliceValue};

/// Object-safe view of anything that owns one slice.
pub trait SliceReducer: Send + Sync {
    fn initial_state(&self) -> SliceValue;

    /// Must return `state` itself when the action is not handled.
    fn reduce(&self, slice: &str, state: &SliceValue, action: &Action) -> Result<SliceValue>;

    /// `Some(owned)` when ownership is known up front, `None` for reducers
    /// that inspect every action.
    fn owns(&self, tag: &str) -> Option<bool>;

    fn snapshot(&self, slice: &str, state: &SliceValue) -> Result<serde_json::Value>;

    fn creators(&self) -> Vec<ActionCreator> {
        Vec::new()
    }

    /// Payload types of the tags this reducer decodes. Reducers that read
    /// raw payloads report none.
    fn shapes(&self) -> Vec<PayloadShape> {
        Vec::new()
    }
}

fn downcast<S: Any + Send + Sync>(slice: &str, state: &SliceValue) -> Result<Arc<S>> {
    Arc::clone(state)
        .downcast::<S>()
        .map_err(|_| SlicekitError::SliceType(slice.to_string()))
}

fn snapshot_of<S: Serialize>(slice: &str, state: &S) -> Result<serde_json::Value> {
    serde_json::to_value(state).map_err(|source| SlicekitError::Snapshot {
        slice: slice.to_string(),
        source,
    })
}

impl<S> SliceReducer for Module<S>
where
    S: Serialize + Send + Sync + 'static,
{
    fn initial_state(&self) -> SliceValue {
        Arc::clone(Module::initial_state(self)) as SliceValue
    }

    fn reduce(&self, slice: &str, state: &SliceValue, action: &Action) -> Result<SliceValue> {
        let typed = downcast::<S>(slice, state)?;
        Ok(Module::reduce(self, &typed, action)? as SliceValue)
    }

    fn owns(&self, tag: &str) -> Option<bool> {
        Some(Module::owns(self, tag))
    }

    fn snapshot(&self, slice: &str, state: &SliceValue) -> Result<serde_json::Value> {
        snapshot_of(slice, &*downcast::<S>(slice, state)?)
    }

    fn creators(&self) -> Vec<ActionCreator> {
        Module::creators(self)
    }

    fn shapes(&self) -> Vec<PayloadShape> {
        Module::shapes(self)
    }
}

// ---------------------------------------------------------------------------
// External reducers
// ---------------------------------------------------------------------------

type ReduceFn<S> = Arc<dyn Fn(&Arc<S>, &Action) -> Arc<S> + Send + Sync>;

/// A plain `(state, action) -> state` function owning one slice, for state
/// that is not described by action groups.
///
/// Return `Arc::clone(state)` for actions the reducer does not handle.
pub struct ExternalReducer<S> {
    initial_state: Arc<S>,
    reduce: ReduceFn<S>,
}

impl<S: Send + Sync + 'static> ExternalReducer<S> {
    pub fn new(
        initial_state: S,
        reduce: impl Fn(&Arc<S>, &Action) -> Arc<S> + Send + Sync + 'static,
    ) -> Self {
        Self {
            initial_state: Arc::new(initial_state),
            reduce: Arc::new(reduce),
        }
    }

    pub fn initial_state(&self) -> &Arc<S> {
        &self.initial_state
    }

    pub fn reduce(&self, state: &Arc<S>, action: &Action) -> Arc<S> {
        (self.reduce)(state, action)
    }
}

impl<S> Clone for ExternalReducer<S> {
    fn clone(&self) -> Self {
        Self {
            initial_state: Arc::clone(&self.initial_state),
            reduce: Arc::clone(&self.reduce),
        }
    }
}

impl<S> SliceReducer for ExternalReducer<S>
where
    S: Serialize + Send + Sync + 'static,
{
    fn initial_state(&self) -> SliceValue {
        Arc::clone(&self.initial_state) as SliceValue
    }

    fn reduce(&self, slice: &str, state: &SliceValue, action: &Action) -> Result<SliceValue> {
        let typed = downcast::<S>(slice, state)?;
        Ok(ExternalReducer::reduce(self, &typed, action) as SliceValue)
    }

    fn owns(&self, _tag: &str) -> Option<bool> {
        None
    }

    fn snapshot(&self, slice: &str, state: &SliceValue) -> Result<serde_json::Value> {
        snapshot_of(slice, &*downcast::<S>(slice, state)?)
    }
}

// ---------------------------------------------------------------------------
// Slice definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceKind {
    Module,
    External,
}

/// A module or external reducer ready to be mounted under a slice name.
pub struct SliceDef {
    kind: SliceKind,
    reducer: Box<dyn SliceReducer>,
}

impl SliceDef {
    pub fn kind(&self) -> SliceKind {
        self.kind
    }

    pub fn shapes(&self) -> Vec<PayloadShape> {
        self.reducer.shapes()
    }
}

impl<S: Serialize + Send + Sync + 'static> From<Module<S>> for SliceDef {
    fn from(module: Module<S>) -> Self {
        Self {
            kind: SliceKind::Module,
            reducer: Box::new(module),
        }
    }
}

impl<S: Serialize + Send + Sync + 'static> From<ExternalReducer<S>> for SliceDef {
    fn from(reducer: ExternalReducer<S>) -> Self {
        Self {
            kind: SliceKind::External,
            reducer: Box::new(reducer),
        }
    }
}

// ---------------------------------------------------------------------------
// CombinedReducer
// ---------------------------------------------------------------------------

/// Runs every slice reducer on its own slice for each dispatch and assembles
/// the results. Total over `(GlobalState, Action)`: no partial updates.
pub struct CombinedReducer {
    slices: Vec<(String, SliceDef)>,
}

impl CombinedReducer {
    /// Slice names must already be unique; `StoreBuilder` checks this.
    pub(crate) fn new(slices: Vec<(String, SliceDef)>) -> Self {
        Self { slices }
    }

    pub fn initial_state(&self) -> GlobalState {
        GlobalState::from_slices(
            self.slices
                .iter()
                .map(|(name, def)| (name.clone(), def.reducer.initial_state()))
                .collect(),
        )
    }

    pub fn slice_names(&self) -> impl Iterator<Item = &str> {
        self.slices.iter().map(|(name, _)| name.as_str())
    }

    pub fn slices(&self) -> impl Iterator<Item = (&str, &SliceDef)> {
        self.slices.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn creators(&self) -> impl Iterator<Item = (&str, Vec<ActionCreator>)> {
        self.slices
            .iter()
            .filter(|(_, def)| def.kind == SliceKind::Module)
            .map(|(name, def)| (name.as_str(), def.reducer.creators()))
    }

    /// Whether some slice may handle `tag`. External reducers count as
    /// possible owners of every tag.
    pub fn may_handle(&self, tag: &str) -> bool {
        self.slices
            .iter()
            .any(|(_, def)| def.reducer.owns(tag).unwrap_or(true))
    }

    /// Apply `action` to every slice.
    ///
    /// Returns `state` itself when every slice came back unchanged.
    pub fn combine(&self, state: &Arc<GlobalState>, action: &Action) -> Result<Arc<GlobalState>> {
        if !self.may_handle(action.tag().as_str()) {
            trace!(tag = %action.tag(), "No slice owns this action");
        }

        let mut changed = state.len() != self.slices.len();
        let mut next = BTreeMap::new();

        for (name, def) in &self.slices {
            let prev = match state.raw(name) {
                Some(value) => Arc::clone(value),
                None => {
                    changed = true;
                    def.reducer.initial_state()
                }
            };

            let value = def.reducer.reduce(name, &prev, action).map_err(|e| {
                if let SlicekitError::Decode { .. } = e {
                    warn!(
                        slice = %name,
                        tag = %action.tag(),
                        error = %e,
                        "Rejected action payload"
                    );
                }
                e
            })?;

            changed |= !same_value(&prev, &value);
            next.insert(name.clone(), value);
        }

        if changed {
            Ok(Arc::new(GlobalState::from_slices(next)))
        } else {
            Ok(Arc::clone(state))
        }
    }

    /// Serialize every slice present in `state` as `{ slice: value }`.
    pub fn snapshot(&self, state: &GlobalState) -> Result<serde_json::Value> {
        let mut out = serde_json::Map::new();
        for (name, def) in &self.slices {
            if let Some(value) = state.raw(name) {
                out.insert(name.clone(), def.reducer.snapshot(name, value)?);
            }
        }
        Ok(serde_json::Value::Object(out))
    }
}

impl Reducer<Action, GlobalState> for CombinedReducer {
    fn reduce(
        &self,
        state: &Arc<GlobalState>,
        action: &Action,
    ) -> anyhow::Result<Arc<GlobalState>> {
        Ok(self.combine(state, action)?)
    }
}
