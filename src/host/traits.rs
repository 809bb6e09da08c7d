//! Host Collaborator Interfaces
//!
//! The registry and dispatcher consume these; they never reimplement them.
//! All traits are object-safe so hosts can hand in their own implementations.

use std::sync::Arc;
use serde_json::Value;
use super::environment::Dependency;
use super::error::HostResult;

/// Read access to the host configuration (already merged with any overrides)
pub trait ConfigReader: Send + Sync {
    /// Resolve a dotted key such as `dispatcher.token_action`
    fn get(&self, dotted_key: &str, default: Value) -> Value;

    /// Resolve a dotted key as a string
    fn get_str(&self, dotted_key: &str, default: &str) -> String {
        match self.get(dotted_key, Value::Null) {
            Value::String(s) => s,
            Value::Null => default.to_string(),
            other => other.to_string(),
        }
    }

    /// Resolve a dotted key as a list of strings; non-string items are skipped
    fn get_string_list(&self, dotted_key: &str) -> Option<Vec<String>> {
        match self.get(dotted_key, Value::Null) {
            Value::Array(items) => Some(
                items.into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Fire-and-forget log sink
pub trait LogSink: Send + Sync {
    fn log_internal(&self, message: &str);
    fn log_error(&self, message: &str);
}

/// String-keyed persisted option store holding arbitrary serializable values
pub trait OptionStore: Send + Sync {
    fn get_option(&self, name: &str) -> Option<Value>;

    fn update_option(&self, name: &str, value: Value) -> HostResult<()>;

    fn delete_option(&self, name: &str) -> HostResult<()>;

    fn get_option_or(&self, name: &str, default: Value) -> Value {
        self.get_option(name).unwrap_or(default)
    }
}

/// Callback attached to a host lifecycle event
pub type HookCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Host hook-registration facility. Modules call it while activating;
/// the registry never does.
pub trait HookRegistrar: Send + Sync {
    fn add_hook(&self, event: &str, owner: &str, callback: HookCallback);

    /// Detach every hook registered by `owner`, returning how many were removed
    fn remove_hooks(&self, owner: &str) -> usize;
}

/// Resolves typed dependency references against the host's symbol tables
pub trait DependencyResolver: Send + Sync {
    fn is_available(&self, dependency: &Dependency) -> bool;
}

/// Caller identity and anti-forgery checks supplied by the host
pub trait CallerAuth: Send + Sync {
    fn caller_has_capability(&self, capability: &str) -> bool;

    fn verify_token(&self, token: &str, action: &str) -> bool;
}
