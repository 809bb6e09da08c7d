//! Bootstrap Scenarios
//!
//! End-to-end flows through the public API with the builtin modules and a
//! file-backed option store: bootstrap, enablement persistence across
//! restarts, command dispatch and shutdown.

use std::sync::Arc;
use serde_json::{json, Value};
use tempfile::TempDir;
use devpanel::command::{Command, CommandDispatcher, CommandRequest, DispatcherSettings, RequestContext};
use devpanel::host::{
    ExecutionContext, HookRegistry, HostEnvironment, HostServices, JsonFileOptionStore, MemoryLogSink,
    StaticCaller,
};
use devpanel::module::builtin::cache::SHUTDOWN_EVENT;
use devpanel::module::{BuiltinDiscovery, ModuleManager, ModuleState};

const TOKEN: &str = "panel-nonce";

struct Host {
    _dir: TempDir,
    options_path: std::path::PathBuf,
    hooks: Arc<HookRegistry>,
    logger: Arc<MemoryLogSink>,
    caller: Arc<StaticCaller>,
}

impl Host {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let options_path = dir.path().join("options.json");
        Self {
            _dir: dir,
            options_path,
            hooks: Arc::new(HookRegistry::new()),
            logger: Arc::new(MemoryLogSink::new()),
            caller: Arc::new(
                StaticCaller::new()
                    .with_capability("manage_options")
                    .with_token("devpanel_command", TOKEN),
            ),
        }
    }

    fn services(&self, environment: HostEnvironment) -> HostServices {
        let options = JsonFileOptionStore::open(&self.options_path).expect("Failed to open option store");
        HostServices::in_memory()
            .with_options(Arc::new(options))
            .with_hooks(self.hooks.clone())
            .with_logger(self.logger.clone())
            .with_dependencies(Arc::new(environment))
            .with_caller(self.caller.clone())
    }

    /// Fresh manager over the same persisted state, as on a new request
    fn manager(&self, environment: HostEnvironment) -> ModuleManager {
        ModuleManager::new(self.services(environment), Box::new(BuiltinDiscovery))
    }

    fn dispatch(&self, manager: &ModuleManager, command: &str, payload: Value, token: &str) -> devpanel::Envelope {
        manager.dispatch(&CommandRequest::new(command, payload, token), self.caller.clone())
    }

    fn persisted(&self) -> Value {
        let text = std::fs::read_to_string(&self.options_path).unwrap_or_else(|_| "{}".to_string());
        serde_json::from_str(&text).expect("Option store is not valid JSON")
    }
}

fn with_cache_flush() -> HostEnvironment {
    HostEnvironment::new().with_function("cache_flush")
}

#[test]
fn test_core_module_bootstrap() {
    let host = Host::new();
    let mut manager = host.manager(HostEnvironment::new());

    assert!(manager.initialize());
    let status = manager.get_modules_status();
    assert!(status["dashboard"].active);
    assert_eq!(status["dashboard"].status.state, ModuleState::Active);
    assert!(!status["cache"].initialized);

    let envelope = host.dispatch(&manager, "dashboard_ping", json!({}), TOKEN);
    assert!(envelope.success);
    assert_eq!(envelope.data["pong"], json!(true));
}

#[test]
fn test_enabled_module_with_missing_dependency() {
    let host = Host::new();
    {
        let mut manager = host.manager(HostEnvironment::new());
        assert!(manager.initialize());
        // Known but cannot run: activation fails, the list is still written
        assert!(!manager.enable_module("cache"));
        manager.cleanup();
    }
    assert_eq!(host.persisted()["devpanel_enabled_modules"], json!(["dashboard", "cache"]));

    let mut manager = host.manager(HostEnvironment::new());
    assert!(manager.initialize());
    assert!(manager.is_known("cache"));
    assert!(!manager.is_initialized("cache"));
    assert!(manager.is_active("dashboard"));

    let cache = &manager.get_modules_status()["cache"];
    assert_eq!(cache.status.state, ModuleState::CannotRun);
    assert_eq!(cache.status.last_error(), Some("Missing required dependency: function:cache_flush"));
    assert!(host.logger.errors().iter().any(|e| e.contains("Module 'cache' failed to initialize")));
}

#[test]
fn test_enablement_persists_across_requests() {
    let host = Host::new();
    {
        let mut manager = host.manager(with_cache_flush());
        assert!(manager.initialize());
        assert!(manager.enable_module("cache"));
        assert!(manager.enable_module("cache"));
        manager.cleanup();
    }

    let enabled = &host.persisted()["devpanel_enabled_modules"];
    assert_eq!(enabled, &json!(["dashboard", "cache"]));

    let mut manager = host.manager(with_cache_flush());
    assert!(manager.initialize());
    assert!(manager.is_active("cache"));

    let set = host.dispatch(&manager, "cache_set", json!({"key": "greeting", "value": "hi"}), TOKEN);
    assert!(set.success);
    let get = host.dispatch(&manager, "cache_get", json!({"key": "greeting"}), TOKEN);
    assert_eq!(get.data["value"], json!("hi"));

    assert!(manager.disable_module("cache"));
    let gone = host.dispatch(&manager, "cache_get", json!({"key": "greeting"}), TOKEN);
    assert_eq!(gone.message(), Some("Unknown command: cache_get"));
    assert_eq!(host.persisted()["devpanel_enabled_modules"], json!(["dashboard"]));
}

#[test]
fn test_shutdown_hook_and_cleanup() {
    let host = Host::new();
    {
        let mut manager = host.manager(with_cache_flush());
        assert!(manager.initialize());
        assert!(manager.enable_module("cache"));
        manager.cleanup();
    }

    let mut manager = host.manager(with_cache_flush());
    assert!(manager.initialize());
    assert_eq!(host.hooks.fire(SHUTDOWN_EVENT, &json!({})), 1);

    manager.cleanup();
    assert_eq!(host.hooks.hook_count(SHUTDOWN_EVENT), 0);
    assert!(manager.get_modules_status().is_empty());
    assert_eq!(manager.dispatcher().command_count(), 0);
}

#[test]
fn test_dispatch_gates() {
    let host = Host::new();
    let mut manager = host.manager(HostEnvironment::new());
    assert!(manager.initialize());

    let bad_token = host.dispatch(&manager, "dashboard_ping", json!({}), "forged");
    assert!(!bad_token.success);
    assert!(bad_token.message().unwrap().contains("Authentication failed"));

    let unknown = host.dispatch(&manager, "does_not_exist", json!({}), TOKEN);
    assert_eq!(unknown.message(), Some("Unknown command: does_not_exist"));

    let viewer = Arc::new(StaticCaller::new().with_token("devpanel_command", TOKEN));
    let denied = manager.dispatch(&CommandRequest::new("dashboard_ping", json!({}), TOKEN), viewer);
    assert_eq!(denied.message(), Some("Authorization failed: capability 'manage_options' required"));
}

#[test]
fn test_capabilities_required_outside_tests() {
    let host = Host::new();
    let services = host.services(HostEnvironment::new())
        .with_caller(Arc::new(StaticCaller::new()))
        .with_execution(ExecutionContext::Normal);
    let mut manager = ModuleManager::new(services, Box::new(BuiltinDiscovery));

    assert!(manager.initialize());
    assert!(!manager.is_active("dashboard"));
    assert_eq!(
        manager.get_modules_status()["dashboard"].status.last_error(),
        Some("Missing required capability: manage_options")
    );

    let services = host.services(HostEnvironment::new())
        .with_caller(Arc::new(StaticCaller::new()))
        .with_execution(ExecutionContext::Testing);
    let mut manager = ModuleManager::new(services, Box::new(BuiltinDiscovery));
    assert!(manager.initialize());
    assert!(manager.is_active("dashboard"));
}

#[test]
fn test_first_command_registration_wins() {
    let logger = Arc::new(MemoryLogSink::new());
    let mut dispatcher = CommandDispatcher::new(DispatcherSettings::default(), logger.clone());

    assert!(dispatcher.register_command("a", Command::new("ping", |_| Ok(json!("h1")))));
    assert!(!dispatcher.register_command("b", Command::new("ping", |_| Ok(json!("h2")))));

    let caller = Arc::new(
        StaticCaller::new()
            .with_capability("manage_options")
            .with_token("devpanel_command", TOKEN),
    );
    let envelope = dispatcher.dispatch(&RequestContext::new(TOKEN, caller), "ping", &json!({}));
    assert_eq!(envelope.data, json!("h1"));
    assert_eq!(logger.errors().len(), 1);
}

#[test]
fn test_module_config_override_from_store() {
    let host = Host::new();
    {
        let mut manager = host.manager(HostEnvironment::new());
        assert!(manager.initialize());
        assert!(manager.initialize_module("debug_log"));
        assert!(manager.configure_module("debug_log", "max_lines", json!(5), true));
        assert!(!manager.configure_module("debug_log", "max_lines", json!(0), true));
        manager.cleanup();
    }
    assert_eq!(host.persisted()["devpanel_module_debug_log_config"]["max_lines"], json!(5));

    let mut manager = host.manager(HostEnvironment::new());
    assert!(manager.initialize());
    assert!(manager.activate_module("debug_log"));
    assert_eq!(
        manager.module("debug_log").unwrap().get_config_value("max_lines", json!(0)),
        json!(5)
    );
}
