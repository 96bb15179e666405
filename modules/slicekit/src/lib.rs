//! Module composition for partitioned application state.
//!
//! An [`ActionGroup`] pairs a constructor with a pure transition under one
//! tag. A [`Module`] collects groups for a single state slice and checks at
//! build time that every registration key equals its group's tag. A
//! [`Store`] mounts modules (and externally owned reducers) under slice
//! names, fans each dispatch out to them, and offers change-suppressing
//! selectors over the resulting [`GlobalState`].
//!
//! ```ignore
//! let store = Store::builder()
//!     .module("counter", counter)
//!     .build()?;
//!
//! let increment = store.action_creators().create("counter", "INCREMENT", ())?;
//! store.dispatch(increment)?;
//! ```

pub mod action;
pub mod config;
pub mod creators;
pub mod error;
pub mod group;
pub mod module;
pub mod reducer;
pub mod select;
pub mod state;
pub mod store;
pub mod update;

pub use action::{Action, ActionPayload, Tag, RESERVED_TAG_PREFIX};
pub use config::StoreConfig;
pub use creators::{ActionCreator, ActionCreatorTable, SliceCreators};
pub use error::{Result, SlicekitError};
pub use group::{build_action_group, ActionEntry, ActionGroup, PayloadShape};
pub use module::{build_module, Module, ModuleBuilder};
pub use reducer::{CombinedReducer, ExternalReducer, SliceDef, SliceKind, SliceReducer};
pub use select::Selector;
pub use state::{GlobalState, SliceValue};
pub use store::{build_store, DefaultEngine, DynMiddleware, Store, StoreBuilder};

pub use slicekit_engine::{
    ActionRecorder, Engine, EngineError, Listener, LoggingMiddleware, Middleware, RecordedAction,
    StoreEngine, Subscription,
};
