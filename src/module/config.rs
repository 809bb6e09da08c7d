//! Module Configuration
//!
//! A module's merged configuration: defaults deep-merged with the persisted
//! per-module override. Changes stay in memory until explicitly saved.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object holding one module's configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleConfig {
    values: Map<String, Value>,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value; anything other than an object yields an empty config
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    pub fn with<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Look up `key`, which may be a dotted path into nested objects
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.values.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn get_value(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Set `key` (dotted paths create intermediate objects, replacing
    /// non-object values in the way)
    pub fn set_value(&mut self, key: &str, value: Value) {
        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return,
        };

        let mut current = &mut self.values;
        for part in parents {
            let entry = current.entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.to_string(), value);
    }

    /// Deep-merge `overrides` on top of this configuration. Nested objects
    /// merge key by key; every other value is replaced.
    pub fn merge(&mut self, overrides: &ModuleConfig) {
        merge_maps(&mut self.values, &overrides.values);
    }

    /// Defaults merged with overrides, leaving both untouched
    pub fn merged(defaults: &ModuleConfig, overrides: &ModuleConfig) -> ModuleConfig {
        let mut merged = defaults.clone();
        merged.merge(overrides);
        merged
    }
}

fn merge_maps(base: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        let both_objects = matches!(base.get(key), Some(Value::Object(_))) && value.is_object();
        if !both_objects {
            base.insert(key.clone(), value.clone());
            continue;
        }
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (base.get_mut(key), value) {
            merge_maps(existing, incoming);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge() {
        let defaults = ModuleConfig::from_value(json!({
            "max_lines": 100,
            "display": {"colour": true, "width": 80},
            "tags": ["a", "b"],
        }));
        let overrides = ModuleConfig::from_value(json!({
            "display": {"width": 120},
            "tags": ["c"],
            "extra": "yes",
        }));

        let merged = ModuleConfig::merged(&defaults, &overrides);
        assert_eq!(merged.to_value(), json!({
            "max_lines": 100,
            "display": {"colour": true, "width": 120},
            "tags": ["c"],
            "extra": "yes",
        }));
    }

    #[test]
    fn test_dotted_get_and_set() {
        let mut config = ModuleConfig::new().with("display", json!({"width": 80}));
        assert_eq!(config.get_u64("display.width"), Some(80));
        assert!(config.get("display.missing").is_none());
        assert!(config.get("display.width.deeper").is_none());
        assert_eq!(config.get_value("nope", json!("dflt")), json!("dflt"));

        config.set_value("display.colour", json!(false));
        config.set_value("limits.max", json!(5));
        assert_eq!(config.get_bool("display.colour"), Some(false));
        assert_eq!(config.get_u64("limits.max"), Some(5));

        // Non-object intermediates are replaced
        config.set_value("display.width.px", json!(1));
        assert_eq!(config.get_u64("display.width.px"), Some(1));
    }

    #[test]
    fn test_from_non_object() {
        assert!(ModuleConfig::from_value(json!([1, 2])).is_empty());
        assert!(ModuleConfig::from_value(Value::Null).is_empty());
    }
}
