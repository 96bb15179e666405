//! The demo store: a counter, an append-only list, a string map and one
//! externally owned slice.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slicekit::update::{appended, with_entry, without_entry};
use slicekit::{
    build_action_group, Action, ActionPayload, ExternalReducer, Module, Result, Store,
    StoreConfig,
};

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

#[derive(Debug, Serialize, Deserialize)]
pub struct Push {
    pub val: i64,
}

impl ActionPayload for Push {
    const TAG: &'static str = "PUSH";
}

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

pub type Entries = BTreeMap<String, String>;

pub fn counter() -> Result<Module<Counter>> {
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
}

pub fn array() -> Result<Module<Vec<i64>>> {
    Module::builder(Vec::new())
        .action(
            "PUSH",
            build_action_group(
                |val: i64| Push { val },
                |items: &Vec<i64>, p: &Push| appended(items, p.val),
            ),
        )
        .build()
}

pub fn map() -> Result<Module<Entries>> {
    Module::builder(Entries::new())
        .action(
            "SET_VALUE",
            build_action_group(
                |(key, value): (String, String)| SetValue { key, value },
                |m: &Entries, p: &SetValue| with_entry(m, p.key.clone(), p.value.clone()),
            ),
        )
        .action(
            "DELETE_VALUE",
            build_action_group(
                |key: String| DeleteValue { key },
                |m: &Entries, p: &DeleteValue| without_entry(m, p.key.as_str()),
            ),
        )
        .build()
}

/// Replaced wholesale by `{ "tag": "CUSTOM", "payload": { "val": .. } }`.
pub fn custom() -> ExternalReducer<String> {
    ExternalReducer::new(String::new(), |state: &Arc<String>, action: &Action| {
        if action.tag() != "CUSTOM" {
            return Arc::clone(state);
        }
        match action.payload().get("val").and_then(|v| v.as_str()) {
            Some(val) => Arc::new(val.to_string()),
            None => Arc::clone(state),
        }
    })
}

pub fn store(config: StoreConfig) -> Result<Store> {
    Store::builder()
        .config(config)
        .module("counter", counter()?)
        .module("array", array()?)
        .module("map", map()?)
        .reducer("storekey", custom())
        .build()
}
