mod slices;

use anyhow::Result;
use slicekit::{Action, GlobalState, StoreConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::slices::Counter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("slicekit=info".parse()?))
        .init();

    let config = StoreConfig::from_env()?;
    let store = slices::store(config)?;

    info!(store = store.name(), store_id = %store.id(), "Slicekit demo starting");

    let _count = store.select(
        |state: &GlobalState| state.slice::<Counter>("counter").map_or(0, |c| c.count),
        |count: &i64| info!(count, "Counter changed"),
    );

    let creators = store.action_creators();
    store.dispatch(creators.create("counter", "INCREMENT", ())?)?;
    store.dispatch(creators.create("counter", "INCREMENT", ())?)?;
    store.dispatch(creators.create("counter", "DECREMENT", ())?)?;

    for val in [3i64, 1, 4] {
        store.dispatch(creators.create("array", "PUSH", val)?)?;
    }

    for (key, value) in [("a", "1"), ("b", "2")] {
        store.dispatch(creators.create(
            "map",
            "SET_VALUE",
            (key.to_string(), value.to_string()),
        )?)?;
    }
    store.dispatch(creators.create("map", "DELETE_VALUE", "a".to_string())?)?;

    // No module owns CUSTOM; the external reducer picks it up.
    store.dispatch(Action::new(
        "CUSTOM",
        serde_json::json!({ "val": "newState" }),
    ))?;

    let snapshot = store.snapshot()?;
    info!(slices = snapshot.as_object().map_or(0, |o| o.len()), "Demo finished");
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
