//! Host Services Bundle
//!
//! The collaborators a module needs during its lifecycle, passed explicitly
//! instead of reached through globals.

use std::sync::Arc;
use parking_lot::Mutex;
use serde_json::Value;
use super::auth::StaticCaller;
use super::environment::{ExecutionContext, HostEnvironment};
use super::hooks::HookRegistry;
use super::options::MemoryOptionStore;
use super::traits::{CallerAuth, ConfigReader, DependencyResolver, HookRegistrar, LogSink, OptionStore};

/// Cheaply cloneable handle to every host collaborator
#[derive(Clone)]
pub struct HostServices {
    pub config: Arc<dyn ConfigReader>,
    pub logger: Arc<dyn LogSink>,
    pub options: Arc<dyn OptionStore>,
    pub hooks: Arc<dyn HookRegistrar>,
    pub dependencies: Arc<dyn DependencyResolver>,
    /// Caller on whose behalf the bootstrap runs (capability checks in `can_run`)
    pub caller: Arc<dyn CallerAuth>,
    pub execution: ExecutionContext,
}

impl HostServices {
    pub fn new(
        config: Arc<dyn ConfigReader>,
        logger: Arc<dyn LogSink>,
        options: Arc<dyn OptionStore>,
        hooks: Arc<dyn HookRegistrar>,
        dependencies: Arc<dyn DependencyResolver>,
        caller: Arc<dyn CallerAuth>,
    ) -> Self {
        Self {
            config,
            logger,
            options,
            hooks,
            dependencies,
            caller,
            execution: ExecutionContext::Normal,
        }
    }

    /// Self-contained services for tests and embedding experiments: empty
    /// configuration, in-memory option store, empty host environment and a
    /// caller without capabilities.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(EmptyConfig),
            Arc::new(MemoryLogSink::new()),
            Arc::new(MemoryOptionStore::new()),
            Arc::new(HookRegistry::new()),
            Arc::new(HostEnvironment::new()),
            Arc::new(StaticCaller::new()),
        )
    }

    pub fn with_execution(mut self, execution: ExecutionContext) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_config(mut self, config: Arc<dyn ConfigReader>) -> Self {
        self.config = config;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_options(mut self, options: Arc<dyn OptionStore>) -> Self {
        self.options = options;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HookRegistrar>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Arc<dyn DependencyResolver>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_caller(mut self, caller: Arc<dyn CallerAuth>) -> Self {
        self.caller = caller;
        self
    }
}

/// Configuration reader with no keys
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyConfig;

impl ConfigReader for EmptyConfig {
    fn get(&self, _dotted_key: &str, default: Value) -> Value {
        default
    }
}

/// Log sink that keeps every line in memory
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Internal,
    Error,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines_at(LogLevel::Error)
    }

    pub fn internal(&self) -> Vec<String> {
        self.lines_at(LogLevel::Internal)
    }

    fn lines_at(&self, level: LogLevel) -> Vec<String> {
        self.lines.lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl LogSink for MemoryLogSink {
    fn log_internal(&self, message: &str) {
        self.lines.lock().push((LogLevel::Internal, message.to_string()));
    }

    fn log_error(&self, message: &str) {
        self.lines.lock().push((LogLevel::Error, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_sink_separates_levels() {
        let sink = MemoryLogSink::new();
        sink.log_internal("booting");
        sink.log_error("boom");
        sink.log_internal("done");

        assert_eq!(sink.internal(), vec!["booting".to_string(), "done".to_string()]);
        assert_eq!(sink.errors(), vec!["boom".to_string()]);
    }

    #[test]
    fn test_empty_config_returns_default() {
        let config = EmptyConfig;
        assert_eq!(config.get("a.b", Value::Bool(true)), Value::Bool(true));
        assert_eq!(config.get_str("a.b", "fallback"), "fallback");
        assert!(config.get_string_list("a.b").is_none());
    }
}
