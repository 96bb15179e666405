//! Core traits for the store engine.

use std::sync::Arc;

use anyhow::Result;

use crate::listeners::{Listener, Subscription};

/// Actions carry a tag string and know how to serialize for logs and recorders.
pub trait ActionLike: Clone + Send + Sync + 'static {
    /// The discriminant tag that routes this action to its owner.
    fn tag(&self) -> &str;

    /// Serialize this action's payload to JSON.
    fn to_payload(&self) -> serde_json::Value;
}

/// Pure state transition. No I/O, no side effects.
///
/// Returning the same `Arc` that was passed in means "unchanged". Engines and
/// listeners rely on pointer identity to skip work for untouched state.
pub trait Reducer<A: ActionLike, S>: Send + Sync {
    fn reduce(&self, state: &Arc<S>, action: &A) -> Result<Arc<S>>;
}

impl<A: ActionLike, S, R: Reducer<A, S> + ?Sized> Reducer<A, S> for Arc<R> {
    fn reduce(&self, state: &Arc<S>, action: &A) -> Result<Arc<S>> {
        (**self).reduce(state, action)
    }
}

/// Hooks around engine creation and every dispatch.
///
/// Middleware runs on the dispatching thread while the dispatch lock is
/// held, so it must not dispatch itself.
pub trait Middleware<A: ActionLike, S>: Send + Sync {
    /// Called once while the engine is being created. An error aborts creation.
    fn on_create(&self, _state: &S) -> Result<()> {
        Ok(())
    }

    /// Called before the reducer runs. An error aborts the dispatch and
    /// leaves state untouched.
    fn before_dispatch(&self, _action: &A, _state: &S) -> Result<()> {
        Ok(())
    }

    /// Called after the new state has been committed.
    fn after_dispatch(&self, _action: &A, _prev: &Arc<S>, _next: &Arc<S>) {}
}

impl<A: ActionLike, S, M: Middleware<A, S> + ?Sized> Middleware<A, S> for Arc<M> {
    fn on_create(&self, state: &S) -> Result<()> {
        (**self).on_create(state)
    }

    fn before_dispatch(&self, action: &A, state: &S) -> Result<()> {
        (**self).before_dispatch(action, state)
    }

    fn after_dispatch(&self, action: &A, prev: &Arc<S>, next: &Arc<S>) {
        (**self).after_dispatch(action, prev, next)
    }
}

/// The narrow contract a store façade needs from its engine.
///
/// `dispatch` completes synchronously: once it returns `Ok`, `get_state`
/// observes the new state and every listener has been notified.
pub trait StoreEngine<A: ActionLike, S>: Send + Sync {
    fn dispatch(&self, action: A) -> Result<()>;

    fn get_state(&self) -> Arc<S>;

    fn subscribe(&self, listener: Listener<S>) -> Subscription;

    /// Subscribe and call the listener once with the current state.
    ///
    /// Engines that notify from several threads should override this so the
    /// initial call is ordered with commit notifications.
    fn subscribe_with_current(&self, listener: Listener<S>) -> Subscription {
        let subscription = self.subscribe(Arc::clone(&listener));
        listener(&self.get_state());
        subscription
    }
}
