//! Integration tests for the Engine dispatch loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use slicekit_engine::{
    ActionLike, ActionRecorder, Engine, EngineError, Listener, Middleware, Reducer, StoreEngine,
};

// ---------------------------------------------------------------------------
// Test action type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum TestAction {
    Add(i64),
    Label(String),
    Noop,
    Boom,
}

impl ActionLike for TestAction {
    fn tag(&self) -> &str {
        match self {
            TestAction::Add(_) => "test:add",
            TestAction::Label(_) => "test:label",
            TestAction::Noop => "test:noop",
            TestAction::Boom => "test:boom",
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        match self {
            TestAction::Add(n) => serde_json::json!({ "n": n }),
            TestAction::Label(label) => serde_json::json!({ "label": label }),
            TestAction::Noop | TestAction::Boom => serde_json::Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Test state
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
struct TestState {
    total: i64,
    labels: Vec<String>,
}

// ---------------------------------------------------------------------------
// Test reducer
// ---------------------------------------------------------------------------

struct TestReducer;

impl Reducer<TestAction, TestState> for TestReducer {
    fn reduce(&self, state: &Arc<TestState>, action: &TestAction) -> Result<Arc<TestState>> {
        match action {
            TestAction::Add(n) => Ok(Arc::new(TestState {
                total: state.total + n,
                ..(**state).clone()
            })),
            TestAction::Label(label) => {
                let mut labels = state.labels.clone();
                labels.push(label.clone());
                Ok(Arc::new(TestState {
                    labels,
                    ..(**state).clone()
                }))
            }
            TestAction::Noop => Ok(Arc::clone(state)),
            TestAction::Boom => bail!("reducer refused test:boom"),
        }
    }
}

fn engine() -> Engine<TestAction, TestState, TestReducer> {
    Engine::new(TestReducer, Arc::new(TestState::default()))
}

// ---------------------------------------------------------------------------
// Middleware that refuses to start
// ---------------------------------------------------------------------------

struct RejectOnCreate;

impl Middleware<TestAction, TestState> for RejectOnCreate {
    fn on_create(&self, _state: &TestState) -> Result<()> {
        bail!("initial state rejected")
    }
}

// ---------------------------------------------------------------------------
// Middleware that vetoes one tag
// ---------------------------------------------------------------------------

struct VetoLabels;

impl Middleware<TestAction, TestState> for VetoLabels {
    fn before_dispatch(&self, action: &TestAction, _state: &TestState) -> Result<()> {
        if action.tag() == "test:label" {
            bail!("labels are disabled");
        }
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn dispatch_applies_reducer_before_returning() {
    let engine = engine();

    engine.dispatch(TestAction::Add(2)).unwrap();
    engine.dispatch(TestAction::Add(3)).unwrap();

    assert_eq!(engine.get_state().total, 5);
}

#[test]
fn unchanged_state_keeps_pointer_identity() {
    let engine = engine();
    let before = engine.get_state();

    engine.dispatch(TestAction::Noop).unwrap();

    assert!(Arc::ptr_eq(&before, &engine.get_state()));
}

#[test]
fn reducer_error_propagates_and_leaves_state_unchanged() {
    let engine = engine();
    engine.dispatch(TestAction::Add(1)).unwrap();
    let before = engine.get_state();

    let err = engine.dispatch(TestAction::Boom).unwrap_err();

    assert!(err.to_string().contains("test:boom"));
    assert!(Arc::ptr_eq(&before, &engine.get_state()));
}

#[test]
fn listeners_see_committed_state_in_registration_order() {
    let engine = engine();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&seen);
    let _a = engine.subscribe(Arc::new(move |state: &Arc<TestState>| {
        first.lock().unwrap().push(("first", state.total));
    }));
    let second = Arc::clone(&seen);
    let _b = engine.subscribe(Arc::new(move |state: &Arc<TestState>| {
        second.lock().unwrap().push(("second", state.total));
    }));

    engine.dispatch(TestAction::Add(7)).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
}

#[test]
fn unsubscribed_listener_is_not_called() {
    let engine = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let sub = engine.subscribe(Arc::new(move |_: &Arc<TestState>| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    engine.dispatch(TestAction::Add(1)).unwrap();
    assert!(sub.unsubscribe());
    engine.dispatch(TestAction::Add(1)).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.listener_count(), 0);
}

#[test]
fn listener_may_dispatch_follow_up_action() {
    let engine = Arc::new(engine());

    let inner = Arc::downgrade(&engine);
    let _sub = engine.subscribe(Arc::new(move |state: &Arc<TestState>| {
        if state.total == 1 && state.labels.is_empty() {
            if let Some(engine) = inner.upgrade() {
                engine.dispatch(TestAction::Label("one".into())).unwrap();
            }
        }
    }));

    engine.dispatch(TestAction::Add(1)).unwrap();

    let state = engine.get_state();
    assert_eq!(state.total, 1);
    assert_eq!(state.labels, vec!["one"]);
}

#[test]
fn follow_up_dispatch_is_delivered_after_the_current_round() {
    let engine = Arc::new(engine());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let inner = Arc::downgrade(&engine);
    let _first = engine.subscribe(Arc::new(move |state: &Arc<TestState>| {
        if state.total == 1 && state.labels.is_empty() {
            if let Some(engine) = inner.upgrade() {
                engine.dispatch(TestAction::Label("one".into())).unwrap();
            }
        }
    }));
    let sink = Arc::clone(&seen);
    let _second = engine.subscribe(Arc::new(move |state: &Arc<TestState>| {
        sink.lock().unwrap().push((state.total, state.labels.len()));
    }));

    engine.dispatch(TestAction::Add(1)).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![(1, 0), (1, 1)]);
}

#[test]
fn dispatch_from_inside_reducer_is_rejected() {
    struct Nested {
        engine: Mutex<Option<Arc<Engine<TestAction, TestState, TestReducer>>>>,
        error: Mutex<Option<String>>,
    }

    impl Reducer<TestAction, TestState> for Nested {
        fn reduce(
            &self,
            state: &Arc<TestState>,
            action: &TestAction,
        ) -> Result<Arc<TestState>> {
            if let Some(engine) = self.engine.lock().unwrap().as_ref() {
                if let Err(e) = engine.dispatch(TestAction::Noop) {
                    *self.error.lock().unwrap() = Some(e.to_string());
                }
            }
            TestReducer.reduce(state, action)
        }
    }

    let nested = Arc::new(Nested {
        engine: Mutex::new(Some(Arc::new(engine()))),
        error: Mutex::new(None),
    });
    let outer = Engine::new(Arc::clone(&nested), Arc::new(TestState::default()));

    outer.dispatch(TestAction::Add(1)).unwrap();

    assert_eq!(outer.get_state().total, 1);
    assert_eq!(
        nested.error.lock().unwrap().as_deref(),
        Some(EngineError::ReentrantDispatch.to_string().as_str())
    );
}

#[test]
fn failing_on_create_aborts_engine_creation() {
    let middleware: Vec<Arc<dyn Middleware<TestAction, TestState>>> =
        vec![Arc::new(ActionRecorder::new()), Arc::new(RejectOnCreate)];

    let result = Engine::create(TestReducer, Arc::new(TestState::default()), middleware);

    let err = result.err().expect("creation should fail");
    assert_eq!(err.to_string(), "initial state rejected");
}

#[test]
fn before_dispatch_veto_skips_reducer_and_listeners() {
    let calls = Arc::new(AtomicUsize::new(0));
    let middleware: Vec<Arc<dyn Middleware<TestAction, TestState>>> = vec![Arc::new(VetoLabels)];
    let engine = Engine::create(TestReducer, Arc::new(TestState::default()), middleware).unwrap();

    let counter = Arc::clone(&calls);
    let _sub = engine.subscribe(Arc::new(move |_: &Arc<TestState>| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(engine.dispatch(TestAction::Label("x".into())).is_err());
    assert!(engine.get_state().labels.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn recorder_captures_dispatch_history() {
    let recorder = Arc::new(ActionRecorder::new());
    let engine = Engine::create(
        TestReducer,
        Arc::new(TestState::default()),
        vec![Arc::clone(&recorder) as Arc<dyn Middleware<TestAction, TestState>>],
    )
    .unwrap();

    engine.dispatch(TestAction::Add(4)).unwrap();
    engine.dispatch(TestAction::Noop).unwrap();
    let _ = engine.dispatch(TestAction::Boom);

    let entries = recorder.entries();
    assert_eq!(recorder.tags(), vec!["test:add", "test:noop"]);
    assert_eq!(entries[0].payload, serde_json::json!({ "n": 4 }));
    assert!(entries[0].changed);
    assert!(!entries[1].changed);
}

#[test]
fn concurrent_dispatches_are_serialized() {
    let engine = Arc::new(engine());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    engine.dispatch(TestAction::Add(1)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.get_state().total, 800);
}

/// Sleeps through its first call so a second commit lands mid-notification.
fn stalls_once(started: mpsc::Sender<()>) -> Listener<TestState> {
    let calls = AtomicUsize::new(0);
    let started = Mutex::new(started);
    Arc::new(move |_: &Arc<TestState>| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let _ = started.lock().unwrap().send(());
            thread::sleep(Duration::from_millis(50));
        }
    })
}

#[test]
fn concurrent_commits_reach_listeners_in_commit_order() {
    let engine = Arc::new(engine());
    let (started, _rx) = mpsc::channel();
    let _slow = engine.subscribe(stalls_once(started));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _totals = engine.subscribe(Arc::new(move |state: &Arc<TestState>| {
        sink.lock().unwrap().push(state.total);
    }));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.dispatch(TestAction::Add(1)).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn initial_value_is_ordered_with_in_flight_commits() {
    let engine = Arc::new(engine());
    let (started, rx) = mpsc::channel();
    let _slow = engine.subscribe(stalls_once(started));

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.dispatch(TestAction::Add(1)).unwrap())
    };
    rx.recv().unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _late = engine.subscribe_with_current(Arc::new(move |state: &Arc<TestState>| {
        sink.lock().unwrap().push(state.total);
    }));
    writer.join().unwrap();
    engine.dispatch(TestAction::Add(1)).unwrap();

    // The late listener starts from the commit it joined on, never before it.
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn panicking_reducer_leaves_engine_usable() {
    struct Panics;

    impl Reducer<TestAction, TestState> for Panics {
        fn reduce(
            &self,
            state: &Arc<TestState>,
            action: &TestAction,
        ) -> Result<Arc<TestState>> {
            if matches!(action, TestAction::Boom) {
                panic!("reducer blew up");
            }
            TestReducer.reduce(state, action)
        }
    }

    let engine = Engine::new(Panics, Arc::new(TestState::default()));
    let before = engine.get_state();

    let outcome = catch_unwind(AssertUnwindSafe(|| engine.dispatch(TestAction::Boom)));
    assert!(outcome.is_err());
    assert!(Arc::ptr_eq(&before, &engine.get_state()));

    engine.dispatch(TestAction::Add(2)).unwrap();
    assert_eq!(engine.get_state().total, 2);
}

#[test]
fn engine_is_usable_through_the_store_engine_trait() {
    fn drive(engine: &dyn StoreEngine<TestAction, TestState>) -> i64 {
        engine.dispatch(TestAction::Add(10)).unwrap();
        engine.get_state().total
    }

    assert_eq!(drive(&engine()), 10);
}
