//! Object Cache Module
//!
//! Inspects and manipulates the panel's object cache. Requires the host to
//! expose `cache_flush`; reports hit/miss statistics at request shutdown.

use std::collections::BTreeMap;
use std::sync::Arc;
use anyhow::{anyhow, bail};
use log::debug;
use parking_lot::Mutex;
use serde_json::{json, Value};
use crate::command::Command;
use crate::host::{Dependency, HostServices};
use crate::module::base::ModuleBehavior;
use crate::module::config::ModuleConfig;
use crate::module::error::{ModuleError, ModuleResult};
use crate::module::traits::ModuleInfo;

pub const NAME: &str = "cache";

/// Host event the statistics hook attaches to
pub const SHUTDOWN_EVENT: &str = "request_shutdown";

const DEFAULT_MAX_ENTRIES: u64 = 1000;

#[derive(Debug, Default)]
struct CacheState {
    entries: BTreeMap<String, Value>,
    hits: u64,
    misses: u64,
    flushes: u64,
}

impl CacheState {
    fn stats(&self) -> Value {
        json!({
            "entries": self.entries.len(),
            "hits": self.hits,
            "misses": self.misses,
            "flushes": self.flushes,
        })
    }
}

#[derive(Debug, Default)]
pub struct CacheModule {
    state: Arc<Mutex<CacheState>>,
}

impl CacheModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Value {
        self.state.lock().stats()
    }
}

fn required_key(payload: &Value) -> anyhow::Result<String> {
    payload.get("key")
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Missing 'key' parameter"))
}

impl ModuleBehavior for CacheModule {
    fn info(&self) -> ModuleInfo {
        ModuleInfo::new(NAME, "Object Cache")
            .with_description("Object cache inspection and flushing")
            .with_capability("manage_options")
            .with_dependency(Dependency::function("cache_flush"))
    }

    fn default_config(&self) -> ModuleConfig {
        ModuleConfig::new().with("max_entries", json!(DEFAULT_MAX_ENTRIES))
    }

    fn validate_module_config(&self, config: &ModuleConfig) -> ModuleResult<()> {
        match config.get_u64("max_entries") {
            Some(n) if n >= 1 => Ok(()),
            _ => Err(ModuleError::invalid_config("max_entries must be a positive integer")),
        }
    }

    fn activate_module(&mut self, _config: &ModuleConfig, host: &HostServices) -> ModuleResult<()> {
        let state = self.state.clone();
        host.hooks.add_hook(SHUTDOWN_EVENT, NAME, Arc::new(move |_payload: &Value| {
            debug!("Object cache at shutdown: {}", state.lock().stats());
        }));
        Ok(())
    }

    fn deactivate_module(&mut self, host: &HostServices) -> ModuleResult<()> {
        host.hooks.remove_hooks(NAME);
        Ok(())
    }

    fn cleanup_module(&mut self) {
        *self.state.lock() = CacheState::default();
    }

    fn commands(&self, config: &ModuleConfig) -> Vec<Command> {
        let max_entries = config.get_u64("max_entries").unwrap_or(DEFAULT_MAX_ENTRIES);
        let (stats, get, set, flush) = (
            self.state.clone(),
            self.state.clone(),
            self.state.clone(),
            self.state.clone(),
        );

        vec![
            Command::new("cache_stats", move |_payload: &Value| Ok(stats.lock().stats()))
                .with_description("Entry count and hit/miss statistics"),
            Command::new("cache_get", move |payload: &Value| {
                let key = required_key(payload)?;
                let mut state = get.lock();
                let value = state.entries.get(&key).cloned();
                match &value {
                    Some(_) => state.hits += 1,
                    None => state.misses += 1,
                }
                Ok(json!({ "key": key, "found": value.is_some(), "value": value }))
            })
            .with_description("Read one entry"),
            Command::new("cache_set", move |payload: &Value| {
                let key = required_key(payload)?;
                let value = payload.get("value").cloned().unwrap_or(Value::Null);
                let mut state = set.lock();
                if !state.entries.contains_key(&key) && state.entries.len() as u64 >= max_entries {
                    bail!("Cache is full ({} entries)", max_entries);
                }
                state.entries.insert(key.clone(), value);
                Ok(json!({ "key": key, "stored": true }))
            })
            .with_description("Write one entry"),
            Command::new("cache_flush", move |_payload: &Value| {
                let mut state = flush.lock();
                let removed = state.entries.len();
                state.entries.clear();
                state.flushes += 1;
                Ok(json!({ "flushed": removed }))
            })
            .with_description("Remove every entry"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ExecutionContext, HookRegistry, HostEnvironment};
    use crate::module::base::ManagedModule;
    use crate::module::traits::{Module, ModuleState};

    fn host(hooks: Arc<HookRegistry>) -> HostServices {
        HostServices::in_memory()
            .with_execution(ExecutionContext::Testing)
            .with_hooks(hooks)
            .with_dependencies(Arc::new(HostEnvironment::new().with_function("cache_flush")))
    }

    fn call(commands: &[Command], name: &str, payload: Value) -> anyhow::Result<Value> {
        let command = commands.iter().find(|c| c.name == name).unwrap();
        (command.handler)(&payload)
    }

    #[test]
    fn test_requires_cache_flush() {
        let mut module = ManagedModule::new(CacheModule::new());
        let host = HostServices::in_memory().with_execution(ExecutionContext::Testing);
        assert!(!module.initialize(&host));
        assert_eq!(module.status().state, ModuleState::CannotRun);
    }

    #[test]
    fn test_cache_commands() {
        let mut module = ManagedModule::new(CacheModule::new());
        assert!(module.initialize(&host(Arc::new(HookRegistry::new()))));
        let commands = module.commands();

        let miss = call(&commands, "cache_get", json!({"key": "a"})).unwrap();
        assert_eq!(miss["found"], json!(false));

        call(&commands, "cache_set", json!({"key": "a", "value": [1, 2]})).unwrap();
        let hit = call(&commands, "cache_get", json!({"key": "a"})).unwrap();
        assert_eq!(hit["value"], json!([1, 2]));

        let stats = call(&commands, "cache_stats", json!({})).unwrap();
        assert_eq!(stats, json!({"entries": 1, "hits": 1, "misses": 1, "flushes": 0}));

        let flushed = call(&commands, "cache_flush", json!({})).unwrap();
        assert_eq!(flushed["flushed"], json!(1));
        assert_eq!(module.behavior().stats()["entries"], json!(0));
    }

    #[test]
    fn test_missing_key_and_capacity() {
        let module = ManagedModule::new(CacheModule::new());
        let config = ModuleConfig::new().with("max_entries", json!(1));
        let commands = module.behavior().commands(&config);

        let err = call(&commands, "cache_get", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Missing 'key' parameter");

        call(&commands, "cache_set", json!({"key": "a", "value": 1})).unwrap();
        // Overwriting an existing key is not growth
        call(&commands, "cache_set", json!({"key": "a", "value": 2})).unwrap();
        let err = call(&commands, "cache_set", json!({"key": "b", "value": 3})).unwrap_err();
        assert!(err.to_string().contains("Cache is full"));
    }

    #[test]
    fn test_invalid_max_entries() {
        let behavior = CacheModule::new();
        assert!(behavior.validate_module_config(&behavior.default_config()).is_ok());
        assert!(behavior.validate_module_config(&ModuleConfig::new().with("max_entries", json!(0))).is_err());
        assert!(behavior.validate_module_config(&ModuleConfig::new().with("max_entries", json!("many"))).is_err());
    }

    #[test]
    fn test_shutdown_hook_lifecycle() {
        let hooks = Arc::new(HookRegistry::new());
        let host = host(hooks.clone());
        let mut module = ManagedModule::new(CacheModule::new());

        assert!(module.initialize(&host));
        assert!(module.on_activate(&host));
        assert_eq!(hooks.fire(SHUTDOWN_EVENT, &json!({})), 1);

        assert!(module.on_deactivate(&host));
        assert_eq!(hooks.fire(SHUTDOWN_EVENT, &json!({})), 0);
    }

    #[test]
    fn test_cleanup_without_deactivate_detaches_hook() {
        let hooks = Arc::new(HookRegistry::new());
        let host = host(hooks.clone());
        let mut module = ManagedModule::new(CacheModule::new());

        assert!(module.initialize(&host));
        assert!(module.on_activate(&host));
        assert_eq!(hooks.hook_count(SHUTDOWN_EVENT), 1);

        module.cleanup();
        assert_eq!(module.status().state, ModuleState::Cleaned);
        assert_eq!(hooks.hook_count(SHUTDOWN_EVENT), 0);
    }
}
