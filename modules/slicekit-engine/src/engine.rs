//! The dispatch loop.

use std::cell::Cell;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use anyhow::Result;
use tracing::{debug, trace};

use crate::error::EngineError;
use crate::listeners::{lock, Listener, Listeners, Subscription};
use crate::traits::{ActionLike, Middleware, Reducer, StoreEngine};

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running a reducer or middleware. Cleared on
/// drop, so a panicking reducer does not leave the flag raised.
struct DispatchFlag;

impl DispatchFlag {
    fn raise() -> Self {
        DISPATCHING.with(|flag| flag.set(true));
        DispatchFlag
    }
}

impl Drop for DispatchFlag {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(false));
    }
}

fn dispatching() -> bool {
    DISPATCHING.with(Cell::get)
}

/// A committed state waiting to be handed to listeners. `target` limits the
/// delivery to one listener (the initial value of a new subscription).
struct Delivery<S> {
    seq: u64,
    state: Arc<S>,
    target: Option<u64>,
}

/// Records which thread is draining the delivery queue. Cleared on drop.
struct Draining<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> Draining<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(slot) = Some(thread::current().id());
        Draining(slot)
    }
}

impl Drop for Draining<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

/// Synchronous store engine.
///
/// Middleware → reduce → commit → notify, all before `dispatch` returns.
/// Concurrent callers are serialized; state is replaced only after the
/// reducer succeeds. Listeners observe commits in commit order.
pub struct Engine<A, S, R>
where
    A: ActionLike,
    S: Send + Sync + 'static,
    R: Reducer<A, S>,
{
    reducer: R,
    middleware: Vec<Arc<dyn Middleware<A, S>>>,
    state: Mutex<Arc<S>>,
    dispatch_lock: Mutex<()>,
    /// Sequence number of the last commit. Written under `dispatch_lock`.
    seq: Mutex<u64>,
    pending: Mutex<VecDeque<Delivery<S>>>,
    delivery_lock: Mutex<()>,
    drainer: Mutex<Option<ThreadId>>,
    listeners: Arc<Listeners<S>>,
    _phantom: PhantomData<fn() -> A>,
}

impl<A, S, R> Engine<A, S, R>
where
    A: ActionLike,
    S: Send + Sync + 'static,
    R: Reducer<A, S>,
{
    /// Engine with no middleware. Cannot fail.
    pub fn new(reducer: R, initial: Arc<S>) -> Self {
        Self {
            reducer,
            middleware: Vec::new(),
            state: Mutex::new(initial),
            dispatch_lock: Mutex::new(()),
            seq: Mutex::new(0),
            pending: Mutex::new(VecDeque::new()),
            delivery_lock: Mutex::new(()),
            drainer: Mutex::new(None),
            listeners: Listeners::new(),
            _phantom: PhantomData,
        }
    }

    /// Build an engine, giving each middleware a chance to reject the
    /// initial state. The first error is returned and nothing is built.
    pub fn create(
        reducer: R,
        initial: Arc<S>,
        middleware: Vec<Arc<dyn Middleware<A, S>>>,
    ) -> Result<Self> {
        for m in &middleware {
            m.on_create(&initial)?;
        }
        debug!(middleware = middleware.len(), "Store engine created");

        Ok(Self {
            middleware,
            ..Self::new(reducer, initial)
        })
    }

    /// Dispatch an action. Runs middleware and the reducer, commits the new
    /// state, then notifies listeners with it.
    ///
    /// A dispatch made from inside a listener is delivered once the current
    /// notification round has finished.
    pub fn dispatch(&self, action: A) -> Result<()> {
        if dispatching() {
            return Err(EngineError::ReentrantDispatch.into());
        }

        let (prev, next) = {
            let _serial = lock(&self.dispatch_lock);
            let _flag = DispatchFlag::raise();

            let prev = self.get_state();

            // 1. Middleware may veto before any reducer runs
            for m in &self.middleware {
                m.before_dispatch(&action, &prev)?;
            }

            // 2. Reduce (pure state update)
            let next = self.reducer.reduce(&prev, &action)?;

            // 3. Commit and queue the delivery in commit order
            *lock(&self.state) = Arc::clone(&next);
            let seq = {
                let mut seq = lock(&self.seq);
                *seq += 1;
                *seq
            };
            lock(&self.pending).push_back(Delivery {
                seq,
                state: Arc::clone(&next),
                target: None,
            });

            for m in &self.middleware {
                m.after_dispatch(&action, &prev, &next);
            }
            (prev, next)
        };

        trace!(
            tag = action.tag(),
            changed = !Arc::ptr_eq(&prev, &next),
            "Action dispatched"
        );

        // 4. Notify outside the dispatch lock so listeners may dispatch
        self.drain();

        Ok(())
    }

    /// Deliver queued commits in order. One thread drains at a time; the
    /// others wait, so a returning `dispatch` has been delivered. A listener
    /// dispatching on the draining thread leaves its commit to the loop.
    fn drain(&self) {
        let me = thread::current().id();
        if *lock(&self.drainer) == Some(me) {
            return;
        }

        let _order = lock(&self.delivery_lock);
        let _draining = Draining::enter(&self.drainer);
        while let Some(delivery) = self.next_delivery() {
            match delivery.target {
                Some(id) => self.listeners.notify_one(id, &delivery.state),
                None => self.listeners.notify(&delivery.state, delivery.seq),
            }
        }
    }

    fn next_delivery(&self) -> Option<Delivery<S>> {
        lock(&self.pending).pop_front()
    }

    pub fn get_state(&self) -> Arc<S> {
        Arc::clone(&lock(&self.state))
    }

    /// Register a listener for every commit after this call.
    pub fn subscribe(&self, listener: Listener<S>) -> Subscription {
        let since = *lock(&self.seq);
        self.listeners.add(listener, since)
    }

    /// Register a listener and hand it the current state first. The initial
    /// call is queued like a commit, so the listener never sees an older
    /// state after a newer one.
    pub fn subscribe_with_current(&self, listener: Listener<S>) -> Subscription {
        // Inside a reducer or middleware this thread already holds the
        // dispatch lock; the enclosing dispatch drains the queue.
        if dispatching() {
            return self.register_with_current(listener);
        }

        let subscription = {
            let _serial = lock(&self.dispatch_lock);
            self.register_with_current(listener)
        };
        self.drain();
        subscription
    }

    fn register_with_current(&self, listener: Listener<S>) -> Subscription {
        let seq = *lock(&self.seq);
        let subscription = self.listeners.add(listener, seq);
        lock(&self.pending).push_back(Delivery {
            seq,
            state: self.get_state(),
            target: Some(subscription.id()),
        });
        subscription
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn reducer(&self) -> &R {
        &self.reducer
    }
}

impl<A, S, R> StoreEngine<A, S> for Engine<A, S, R>
where
    A: ActionLike,
    S: Send + Sync + 'static,
    R: Reducer<A, S>,
{
    fn dispatch(&self, action: A) -> Result<()> {
        Engine::dispatch(self, action)
    }

    fn get_state(&self) -> Arc<S> {
        Engine::get_state(self)
    }

    fn subscribe(&self, listener: Listener<S>) -> Subscription {
        Engine::subscribe(self, listener)
    }

    fn subscribe_with_current(&self, listener: Listener<S>) -> Subscription {
        Engine::subscribe_with_current(self, listener)
    }
}
