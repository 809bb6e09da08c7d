//! Persisted Enablement List
//!
//! The ordered set of module names that should be active after the next
//! bootstrap. The option store is the source of truth, independent of
//! in-memory registry state.

use std::sync::Arc;
use log::debug;
use serde_json::Value;
use crate::host::{ConfigReader, OptionStore};
use super::error::{ModuleError, ModuleResult};

pub const DEFAULT_OPTION_PREFIX: &str = "devpanel";

/// Prefix applied to every option this crate persists
pub fn option_prefix(config: &dyn ConfigReader) -> String {
    config.get_str("option_prefix", DEFAULT_OPTION_PREFIX)
}

/// Option holding the enablement list
pub fn enabled_modules_option(prefix: &str) -> String {
    format!("{}_enabled_modules", prefix)
}

/// Option holding one module's persisted configuration override
pub fn module_config_option(prefix: &str, module: &str) -> String {
    format!("{}_module_{}_config", prefix, module)
}

/// Read/write view of the enablement list in the option store
pub struct EnablementList {
    options: Arc<dyn OptionStore>,
    option_name: String,
    defaults: Vec<String>,
}

impl EnablementList {
    /// `defaults` apply while the option has never been written
    pub fn new(options: Arc<dyn OptionStore>, prefix: &str, defaults: Vec<String>) -> Self {
        Self {
            options,
            option_name: enabled_modules_option(prefix),
            defaults: dedup(defaults),
        }
    }

    pub fn option_name(&self) -> &str {
        &self.option_name
    }

    /// Current list, duplicates removed, original order kept
    pub fn names(&self) -> Vec<String> {
        match self.options.get_option(&self.option_name) {
            Some(Value::Array(items)) => dedup(
                items.into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            Some(other) => {
                debug!("Ignoring malformed enablement list {}: {}", self.option_name, other);
                self.defaults.clone()
            }
            None => self.defaults.clone(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().iter().any(|n| n == name)
    }

    /// Append `name` if absent. Returns whether the list changed.
    pub fn enable(&self, name: &str) -> ModuleResult<bool> {
        let mut names = self.names();
        if names.iter().any(|n| n == name) {
            return Ok(false);
        }
        names.push(name.to_string());
        self.store(names)?;
        Ok(true)
    }

    /// Remove `name` if present. Returns whether the list changed.
    pub fn disable(&self, name: &str) -> ModuleResult<bool> {
        let mut names = self.names();
        let before = names.len();
        names.retain(|n| n != name);
        if names.len() == before {
            return Ok(false);
        }
        self.store(names)?;
        Ok(true)
    }

    /// Forget the persisted list so the defaults apply again
    pub fn reset(&self) -> ModuleResult<()> {
        self.options.delete_option(&self.option_name)
            .map_err(|e| ModuleError::storage(e.to_string()))
    }

    fn store(&self, names: Vec<String>) -> ModuleResult<()> {
        let value = Value::Array(names.into_iter().map(Value::String).collect());
        self.options.update_option(&self.option_name, value)
            .map_err(|e| ModuleError::storage(e.to_string()))
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}
