//! Shared slices for the store integration tests: a counter, an array, a
//! string map and an externally owned string.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slicekit::update::{appended, with_entry, without_entry};
use slicekit::{build_action_group, Action, ActionPayload, ExternalReducer, Module, Store};

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counter {
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Increment;

impl ActionPayload for Increment {
    const TAG: &'static str = "INCREMENT";
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Decrement;

impl ActionPayload for Decrement {
    const TAG: &'static str = "DECREMENT";
}

pub fn counter_module() -> Module<Counter> {
    Module::builder(Counter { count: 0 })
        .action(
            "INCREMENT",
            build_action_group(|()| Increment, |s: &Counter, _: &Increment| Counter {
                count: s.count + 1,
            }),
        )
        .action(
            "DECREMENT",
            build_action_group(|()| Decrement, |s: &Counter, _: &Decrement| Counter {
                count: s.count - 1,
            }),
        )
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Array
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct Push {
    pub val: i64,
}

impl ActionPayload for Push {
    const TAG: &'static str = "PUSH";
}

pub fn array_module() -> Module<Vec<i64>> {
    Module::builder(Vec::new())
        .action(
            "PUSH",
            build_action_group(
                |val: i64| Push { val },
                |items: &Vec<i64>, p: &Push| appended(items, p.val),
            ),
        )
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

pub type StringMap = BTreeMap<String, String>;

#[derive(Debug, Serialize, Deserialize)]
pub struct SetValue {
    pub key: String,
    pub value: String,
}

impl ActionPayload for SetValue {
    const TAG: &'static str = "SET_VALUE";
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteValue {
    pub key: String,
}

impl ActionPayload for DeleteValue {
    const TAG: &'static str = "DELETE_VALUE";
}

pub fn map_module() -> Module<StringMap> {
    Module::builder(StringMap::new())
        .action(
            "SET_VALUE",
            build_action_group(
                |(key, value): (String, String)| SetValue { key, value },
                |map: &StringMap, p: &SetValue| with_entry(map, p.key.clone(), p.value.clone()),
            ),
        )
        .action(
            "DELETE_VALUE",
            build_action_group(
                |key: String| DeleteValue { key },
                |map: &StringMap, p: &DeleteValue| without_entry(map, p.key.as_str()),
            ),
        )
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// External reducer
// ---------------------------------------------------------------------------

/// Owns `CUSTOM` actions built by hand as `{ tag: "CUSTOM", payload: { val } }`.
pub fn custom_reducer() -> ExternalReducer<String> {
    ExternalReducer::new(String::new(), |state: &Arc<String>, action: &Action| {
        match (action.tag().as_str(), action.payload().get("val")) {
            ("CUSTOM", Some(serde_json::Value::String(val))) => Arc::new(val.clone()),
            _ => Arc::clone(state),
        }
    })
}

pub fn custom(val: &str) -> Action {
    Action::new("CUSTOM", serde_json::json!({ "val": val }))
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub fn full_store() -> Store {
    Store::builder()
        .module("counter", counter_module())
        .module("array", array_module())
        .module("map", map_module())
        .reducer("storekey", custom_reducer())
        .build()
        .unwrap()
}

/// Build an action through the store's creator table.
pub fn create<A: 'static>(store: &Store, slice: &str, tag: &str, args: A) -> Action {
    store.action_creators().create(slice, tag, args).unwrap()
}

pub fn count(store: &Store) -> i64 {
    store.read(|state| state.slice::<Counter>("counter").unwrap().count)
}
