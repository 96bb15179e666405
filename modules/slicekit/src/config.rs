use std::env;

use crate::error::{Result, SlicekitError};

/// Store settings, loadable from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Used in log fields to tell stores apart.
    pub name: String,

    /// Install `LoggingMiddleware` so every dispatch emits a debug event.
    pub trace_dispatch: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            trace_dispatch: false,
        }
    }
}

impl StoreConfig {
    /// Load configuration from `SLICEKIT_STORE_NAME` and
    /// `SLICEKIT_TRACE_DISPATCH`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let name = match lookup("SLICEKIT_STORE_NAME") {
            Some(name) if name.trim().is_empty() => {
                return Err(SlicekitError::Config(
                    "SLICEKIT_STORE_NAME must not be empty".to_string(),
                ))
            }
            Some(name) => name,
            None => defaults.name,
        };

        let trace_dispatch = match lookup("SLICEKIT_TRACE_DISPATCH") {
            Some(raw) => parse_flag("SLICEKIT_TRACE_DISPATCH", &raw)?,
            None => defaults.trace_dispatch,
        };

        Ok(Self {
            name,
            trace_dispatch,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_trace_dispatch(mut self, enabled: bool) -> Self {
        self.trace_dispatch = enabled;
        self
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SlicekitError::Config(format!(
            "{key} must be a boolean flag, got {other:?}"
        ))),
    }
}
