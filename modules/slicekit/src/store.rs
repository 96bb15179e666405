//! The store façade: composes slices into one engine and routes dispatch.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use slicekit_engine::{
    Engine, LoggingMiddleware, Middleware, StoreEngine, Subscription,
};
use tracing::info;
use uuid::Uuid;

use crate::action::{Action, Tag};
use crate::config::StoreConfig;
use crate::creators::{ActionCreatorTable, SliceCreators};
use crate::error::{Result, SlicekitError};
use crate::group::PayloadShape;
use crate::module::Module;
use crate::reducer::{CombinedReducer, ExternalReducer, SliceDef};
use crate::select::Selector;
use crate::state::GlobalState;

pub type DynMiddleware = Arc<dyn Middleware<Action, GlobalState>>;

/// The engine a store gets from [`StoreBuilder::build`].
pub type DefaultEngine = Engine<Action, GlobalState, Arc<CombinedReducer>>;

/// Map an engine error back to the core error it carries, if any.
fn from_engine(err: anyhow::Error) -> SlicekitError {
    match err.downcast::<SlicekitError>() {
        Ok(err) => err,
        Err(err) => SlicekitError::Engine(err),
    }
}

// ---------------------------------------------------------------------------
// StoreBuilder
// ---------------------------------------------------------------------------

/// Collects slices and middleware. Slice names are checked in
/// [`StoreBuilder::build`].
pub struct StoreBuilder {
    slices: Vec<(String, SliceDef)>,
    middleware: Vec<DynMiddleware>,
    config: StoreConfig,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            slices: Vec::new(),
            middleware: Vec::new(),
            config: StoreConfig::default(),
        }
    }

    /// Mount `module` under slice `name`.
    pub fn module<S>(self, name: impl Into<String>, module: Module<S>) -> Self
    where
        S: serde::Serialize + Send + Sync + 'static,
    {
        self.slice(name, module)
    }

    /// Mount an externally owned reducer under slice `name`.
    pub fn reducer<S>(self, name: impl Into<String>, reducer: ExternalReducer<S>) -> Self
    where
        S: serde::Serialize + Send + Sync + 'static,
    {
        self.slice(name, reducer)
    }

    pub fn slice(mut self, name: impl Into<String>, def: impl Into<SliceDef>) -> Self {
        self.slices.push((name.into(), def.into()));
        self
    }

    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<Action, GlobalState> + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the store on the default [`Engine`].
    pub fn build(self) -> Result<Store> {
        self.build_with(Engine::create)
    }

    /// Build the store on a custom engine. `create` receives the combined
    /// reducer, the initial global state and the middleware, and may fail;
    /// its error is returned as-is when it came from this crate.
    pub fn build_with<E, F>(self, create: F) -> Result<Store<E>>
    where
        E: StoreEngine<Action, GlobalState>,
        F: FnOnce(
            Arc<CombinedReducer>,
            Arc<GlobalState>,
            Vec<DynMiddleware>,
        ) -> anyhow::Result<E>,
    {
        let StoreBuilder {
            slices,
            mut middleware,
            config,
        } = self;

        check_slice_names(&slices)?;
        check_payload_shapes(&slices)?;

        let reducer = Arc::new(CombinedReducer::new(slices));
        let creators = creator_table(&reducer);
        let initial = Arc::new(reducer.initial_state());

        if config.trace_dispatch {
            middleware.push(Arc::new(LoggingMiddleware::new(config.name.clone())));
        }

        let engine = create(Arc::clone(&reducer), initial, middleware).map_err(from_engine)?;

        let id = Uuid::new_v4();
        let slice_names: Vec<&str> = reducer.slice_names().collect();
        info!(
            store = %config.name,
            store_id = %id,
            slices = ?slice_names,
            "Store built"
        );

        Ok(Store {
            id,
            name: config.name,
            engine,
            reducer,
            creators,
        })
    }
}

fn check_slice_names(slices: &[(String, SliceDef)]) -> Result<()> {
    let mut seen = HashSet::with_capacity(slices.len());
    for (name, _) in slices {
        if name.is_empty() {
            return Err(SlicekitError::InvalidSliceName(name.clone()));
        }
        if !seen.insert(name.as_str()) {
            return Err(SlicekitError::SliceConflict(name.clone()));
        }
    }
    Ok(())
}

/// A tag may be owned by several modules, but every owner must decode it
/// as the same payload type.
fn check_payload_shapes(slices: &[(String, SliceDef)]) -> Result<()> {
    let mut owners: HashMap<Tag, (&str, PayloadShape)> = HashMap::new();
    for (name, def) in slices {
        for shape in def.shapes() {
            match owners.get(shape.tag.as_str()) {
                Some((first_slice, first)) if first.type_id != shape.type_id => {
                    return Err(SlicekitError::TagShapeConflict {
                        tag: shape.tag,
                        first_slice: first_slice.to_string(),
                        first_type: first.type_name,
                        second_slice: name.clone(),
                        second_type: shape.type_name,
                    });
                }
                Some(_) => {}
                None => {
                    owners.insert(shape.tag.clone(), (name.as_str(), shape));
                }
            }
        }
    }
    Ok(())
}

fn creator_table(reducer: &CombinedReducer) -> ActionCreatorTable {
    let mut table = ActionCreatorTable::default();
    for (slice, creators) in reducer.creators() {
        table.insert(SliceCreators::new(slice, creators));
    }
    table
}

/// Functional spelling of [`Store::builder`].
///
/// `modules` and `external` share one slice namespace; a name used twice
/// across them fails with [`SlicekitError::SliceConflict`].
pub fn build_store<K, M, X>(
    modules: M,
    middleware: Option<DynMiddleware>,
    external: X,
) -> Result<Store>
where
    K: Into<String>,
    M: IntoIterator<Item = (K, SliceDef)>,
    X: IntoIterator<Item = (K, SliceDef)>,
{
    let mut builder = modules
        .into_iter()
        .chain(external)
        .fold(StoreBuilder::new(), |builder, (name, def)| {
            builder.slice(name, def)
        });

    if let Some(middleware) = middleware {
        builder.middleware.push(middleware);
    }
    builder.build()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A composed store: one engine holding [`GlobalState`], plus the
/// action-creator table of every mounted module.
pub struct Store<E = DefaultEngine> {
    id: Uuid,
    name: String,
    engine: E,
    reducer: Arc<CombinedReducer>,
    creators: ActionCreatorTable,
}

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }
}

impl<E: StoreEngine<Action, GlobalState>> Store<E> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Route `action` through every slice. Unowned tags are a no-op.
    ///
    /// On error the state is unchanged and no listener runs.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.engine.dispatch(action).map_err(from_engine)
    }

    pub fn get_state(&self) -> Arc<GlobalState> {
        self.engine.get_state()
    }

    pub fn action_creators(&self) -> &ActionCreatorTable {
        &self.creators
    }

    pub fn slice_names(&self) -> impl Iterator<Item = &str> {
        self.reducer.slice_names()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Register a raw listener, called after every dispatch with the
    /// committed state.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Arc<GlobalState>) + Send + Sync + 'static,
    ) -> Subscription {
        self.engine.subscribe(Arc::new(listener))
    }

    /// Evaluate `select` once against the current state.
    pub fn read<T>(&self, select: impl FnOnce(&GlobalState) -> T) -> T {
        select(&self.get_state())
    }

    /// Observe a derived value, compared with `PartialEq`.
    pub fn select<T>(
        &self,
        select: impl Fn(&GlobalState) -> T + Send + Sync + 'static,
        observer: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        self.observe(Selector::new(select), observer)
    }

    /// Observe a derived value with a custom comparison. `equals(prev, cur)`
    /// returning true means `cur` is not delivered.
    pub fn select_with<T>(
        &self,
        select: impl Fn(&GlobalState) -> T + Send + Sync + 'static,
        equals: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
        observer: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription
    where
        T: Clone + Send + Sync + 'static,
    {
        self.observe(Selector::with_equality(select, equals), observer)
    }

    fn observe<T>(
        &self,
        selector: Selector<T>,
        observer: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription
    where
        T: Clone + Send + Sync + 'static,
    {
        // The engine delivers the current state first, ordered with commits.
        self.engine
            .subscribe_with_current(Arc::new(move |state: &Arc<GlobalState>| {
                if let Some(value) = selector.poll(state) {
                    observer(&value);
                }
            }))
    }

    /// Serialize every slice as `{ slice: value }`.
    pub fn snapshot(&self) -> Result<serde_json::Value> {
        self.reducer.snapshot(&self.get_state())
    }
}

impl<E> fmt::Debug for Store<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slices: Vec<&str> = self.reducer.slice_names().collect();
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("slices", &slices)
            .finish_non_exhaustive()
    }
}
