//! Synchronous store engine.
//!
//! Holds one canonical state value, applies a reducer on every dispatch and
//! notifies subscribers before `dispatch` returns: middleware → reduce →
//! commit → notify.
//!
//! Consumers provide the state shape through `Reducer` (pure transitions) and
//! may observe or veto dispatches through `Middleware`.

pub mod engine;
pub mod error;
pub mod listeners;
pub mod record;
pub mod traits;

pub use engine::Engine;
pub use error::EngineError;
pub use listeners::{Listener, Subscription};
pub use record::{ActionRecorder, LoggingMiddleware, RecordedAction};
pub use traits::{ActionLike, Middleware, Reducer, StoreEngine};
