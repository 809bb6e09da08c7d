//! Hook Registry
//!
//! Reference implementation of the host hook-registration facility.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value;
use super::traits::{HookCallback, HookRegistrar};

struct HookEntry {
    owner: String,
    callback: HookCallback,
}

/// Event name -> callbacks, in registration order
#[derive(Default)]
pub struct HookRegistry {
    hooks: Mutex<HashMap<String, Vec<HookEntry>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every callback attached to `event`, returning how many ran.
    /// A panicking callback is logged and skipped.
    pub fn fire(&self, event: &str, payload: &Value) -> usize {
        // Clone out so callbacks may register further hooks
        let callbacks: Vec<HookCallback> = self.hooks.lock()
            .get(event)
            .map(|entries| entries.iter().map(|e| e.callback.clone()).collect())
            .unwrap_or_default();

        debug!("Firing hook '{}' ({} callbacks)", event, callbacks.len());
        let mut ran = 0;
        for callback in &callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(()) => ran += 1,
                Err(_) => warn!("Hook callback for '{}' panicked", event),
            }
        }
        ran
    }

    pub fn hook_count(&self, event: &str) -> usize {
        self.hooks.lock().get(event).map(Vec::len).unwrap_or(0)
    }

    /// Owners with at least one attached hook
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.hooks.lock()
            .values()
            .flat_map(|entries| entries.iter().map(|e| e.owner.clone()))
            .collect();
        owners.sort();
        owners.dedup();
        owners
    }
}

impl HookRegistrar for HookRegistry {
    fn add_hook(&self, event: &str, owner: &str, callback: HookCallback) {
        debug!("Module '{}' attached to hook '{}'", owner, event);
        self.hooks.lock()
            .entry(event.to_string())
            .or_default()
            .push(HookEntry { owner: owner.to_string(), callback });
    }

    fn remove_hooks(&self, owner: &str) -> usize {
        let mut hooks = self.hooks.lock();
        let mut removed = 0;
        for entries in hooks.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.owner != owner);
            removed += before - entries.len();
        }
        hooks.retain(|_, entries| !entries.is_empty());
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fire_and_remove() {
        let registry = HookRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        registry.add_hook("request_shutdown", "cache", Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        registry.add_hook("request_shutdown", "dashboard", Arc::new(|_| {}));

        assert_eq!(registry.hook_count("request_shutdown"), 2);
        assert_eq!(registry.fire("request_shutdown", &Value::Null), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.owners(), vec!["cache".to_string(), "dashboard".to_string()]);

        assert_eq!(registry.remove_hooks("cache"), 1);
        assert_eq!(registry.fire("request_shutdown", &Value::Null), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fire_unknown_event() {
        let registry = HookRegistry::new();
        assert_eq!(registry.fire("never_registered", &Value::Null), 0);
        assert_eq!(registry.remove_hooks("nobody"), 0);
    }

    #[test]
    fn test_panicking_callback_is_skipped() {
        let registry = HookRegistry::new();
        registry.add_hook("request_shutdown", "broken", Arc::new(|_| panic!("hook exploded")));
        registry.add_hook("request_shutdown", "cache", Arc::new(|_| {}));

        assert_eq!(registry.fire("request_shutdown", &Value::Null), 1);
        assert_eq!(registry.hook_count("request_shutdown"), 2);
    }
}
