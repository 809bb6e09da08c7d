//! Module Manager
//!
//! Central coordinator for module lifecycle. Owns the registry and the
//! command dispatcher, bootstraps discovered modules according to the
//! persisted enablement list and keeps the dispatcher's command table in
//! step with which modules are active.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use crate::command::{CommandDispatcher, CommandRequest, DispatcherSettings, Envelope};
use crate::host::{CallerAuth, ConfigReader, HostServices, LogSink};
use super::discovery::ModuleDiscovery;
use super::enablement::{option_prefix, EnablementList};
use super::error::{panic_message, ModuleError, ModuleResult};
use super::registry::ModuleRegistry;
use super::traits::{Module, ModuleInfo, ModuleStatus};
use super::version::{major_version, MODULE_API_VERSION};

/// Modules initialized on every bootstrap regardless of enablement
pub const DEFAULT_CORE_MODULES: &[&str] = &["dashboard"];

/// Bootstrap settings read from the host configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSettings {
    pub option_prefix: String,

    pub core_modules: Vec<String>,

    /// Enablement list used until one has been persisted
    pub default_enabled: Vec<String>,

    pub dispatcher: DispatcherSettings,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        let core: Vec<String> = DEFAULT_CORE_MODULES.iter().map(|s| s.to_string()).collect();
        Self {
            option_prefix: super::enablement::DEFAULT_OPTION_PREFIX.to_string(),
            default_enabled: core.clone(),
            core_modules: core,
            dispatcher: DispatcherSettings::default(),
        }
    }
}

impl ManagerSettings {
    /// Keys: `option_prefix`, `core_modules`, `default_enabled`, `dispatcher.*`
    pub fn from_config(config: &dyn ConfigReader) -> Self {
        let defaults = Self::default();
        let core_modules = config.get_string_list("core_modules").unwrap_or(defaults.core_modules);
        let default_enabled = config.get_string_list("default_enabled").unwrap_or_else(|| core_modules.clone());
        Self {
            option_prefix: option_prefix(config),
            core_modules,
            default_enabled,
            dispatcher: DispatcherSettings::from_config(config),
        }
    }
}

/// One module's entry in the status report
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub info: ModuleInfo,
    pub status: ModuleStatus,
    /// Registry membership, authoritative over the module's own flags
    pub initialized: bool,
    pub active: bool,
}

/// Central module manager responsible for:
/// - Bootstrap from discovery and the enablement list
/// - Per-module initialize/activate/deactivate/cleanup
/// - Command registration for active modules
/// - Registry and dispatcher ownership
pub struct ModuleManager {
    registry: ModuleRegistry,
    dispatcher: CommandDispatcher,
    enablement: EnablementList,
    host: HostServices,
    discovery: Box<dyn ModuleDiscovery>,
    settings: ManagerSettings,
    bootstrapped: bool,
}

impl ModuleManager {
    /// Create a manager with settings read from the host configuration
    pub fn new(host: HostServices, discovery: Box<dyn ModuleDiscovery>) -> Self {
        let settings = ManagerSettings::from_config(host.config.as_ref());
        Self::with_settings(host, discovery, settings)
    }

    pub fn with_settings(host: HostServices, discovery: Box<dyn ModuleDiscovery>, settings: ManagerSettings) -> Self {
        let dispatcher = CommandDispatcher::new(settings.dispatcher.clone(), host.logger.clone());
        let enablement = EnablementList::new(
            host.options.clone(),
            &settings.option_prefix,
            settings.default_enabled.clone(),
        );
        Self {
            registry: ModuleRegistry::new(),
            dispatcher,
            enablement,
            host,
            discovery,
            settings,
            bootstrapped: false,
        }
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn host(&self) -> &HostServices {
        &self.host
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Check a module's API version against the one this crate implements
    pub fn validate_module_compatibility(&self, info: &ModuleInfo) -> ModuleResult<()> {
        if !info.is_compatible_with_api(MODULE_API_VERSION) {
            return Err(ModuleError::version_incompatible(format!(
                "Module '{}' has incompatible API version {} (expected major version {})",
                info.name,
                info.api_version,
                major_version(MODULE_API_VERSION)
            )));
        }
        Ok(())
    }

    /// Bootstrap: register discovered modules, initialize core modules,
    /// then initialize and activate every enabled module. Repeat calls
    /// after a successful bootstrap are no-ops. A discovery failure or an
    /// unexpected fault aborts and returns false; per-module failures are
    /// logged and skipped.
    pub fn initialize(&mut self) -> bool {
        if self.bootstrapped {
            return true;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.bootstrap()));
        match outcome {
            Ok(Ok(())) => {
                self.bootstrapped = true;
                info!(
                    "Module bootstrap complete: {} known, {} initialized, {} active",
                    self.registry.len(),
                    self.registry.initialized_count(),
                    self.registry.active_count()
                );
                true
            }
            Ok(Err(e)) => {
                self.host.logger.log_error(&format!("Module bootstrap failed: {}", e));
                false
            }
            Err(payload) => {
                self.host.logger.log_error(&format!("Module bootstrap fault: {}", panic_message(payload.as_ref())));
                false
            }
        }
    }

    fn bootstrap(&mut self) -> ModuleResult<()> {
        let discovered = self.discovery.discover()?;
        debug!("Discovered {} modules", discovered.len());

        for (name, module) in discovered {
            if let Err(e) = self.validate_module_compatibility(module.module_info()) {
                self.host.logger.log_error(&e.to_string());
                continue;
            }
            if let Err(e) = self.registry.register(&name, module) {
                // A module registered by the host before bootstrap takes precedence
                self.host.logger.log_internal(&format!("Skipping discovered module: {}", e));
            }
        }

        for name in self.settings.core_modules.clone() {
            if self.registry.is_known(&name) {
                self.initialize_module(&name);
            } else {
                warn!("Core module '{}' is not registered", name);
            }
        }

        let enabled = self.enablement.names();
        for name in &enabled {
            if !self.registry.is_known(name) {
                self.host.logger.log_internal(&format!("Enabled module '{}' is not registered", name));
                continue;
            }
            self.initialize_module(name);
        }

        for name in &enabled {
            if self.registry.is_initialized(name) {
                self.activate_module(name);
            }
        }

        Ok(())
    }

    /// Add a module under `name`. Duplicate names are rejected and logged;
    /// the first registration is kept.
    pub fn register_module(&mut self, name: &str, module: Box<dyn Module>) -> bool {
        match self.registry.register(name, module) {
            Ok(()) => {
                debug!("Registered module '{}'", name);
                true
            }
            Err(e) => {
                self.host.logger.log_error(&e.to_string());
                false
            }
        }
    }

    pub fn initialize_module(&mut self, name: &str) -> bool {
        if self.registry.is_initialized(name) {
            return true;
        }

        let host = &self.host;
        let module = match self.registry.get_mut(name) {
            Some(module) => module,
            None => {
                host.logger.log_error(&ModuleError::not_found(name).to_string());
                return false;
            }
        };

        let initialized = guarded(host.logger.as_ref(), module, "initialize", |m| m.initialize(host))
            .unwrap_or(false);
        if !initialized {
            let reason = module.status().last_error().unwrap_or("unknown error").to_string();
            host.logger.log_error(&format!("Module '{}' failed to initialize: {}", name, reason));
            return false;
        }

        // Known was checked above
        self.registry.mark_initialized(name).is_ok()
    }

    /// Activate a module, initializing it first if needed, and register
    /// its commands with the dispatcher.
    pub fn activate_module(&mut self, name: &str) -> bool {
        if !self.registry.is_known(name) {
            self.host.logger.log_error(&ModuleError::not_found(name).to_string());
            return false;
        }
        if self.registry.is_active(name) {
            return true;
        }
        if !self.registry.is_initialized(name) && !self.initialize_module(name) {
            return false;
        }

        let host = &self.host;
        let module = match self.registry.get_mut(name) {
            Some(module) => module,
            None => return false,
        };

        let activated = guarded(host.logger.as_ref(), module, "activate", |m| m.on_activate(host))
            .unwrap_or(false);
        if !activated {
            let reason = module.status().last_error().unwrap_or("unknown error").to_string();
            host.logger.log_error(&format!("Module '{}' failed to activate: {}", name, reason));
            return false;
        }

        let commands = match guarded(host.logger.as_ref(), module, "commands", |m| m.commands()) {
            Some(commands) => commands,
            None => {
                // Undo the activation so the registry never holds an active module in error
                guarded(host.logger.as_ref(), module, "deactivate", |m| m.on_deactivate(host));
                module.record_error(format!("Module '{}' activation rolled back: commands unavailable", name));
                return false;
            }
        };
        let mut registered = 0;
        for command in commands {
            if self.dispatcher.register_command(name, command) {
                registered += 1;
            }
        }
        debug!("Module '{}' active with {} commands", name, registered);

        self.registry.mark_active(name).is_ok()
    }

    /// Deactivate a module and retract its commands. Inactive modules
    /// succeed without side effects.
    pub fn deactivate_module(&mut self, name: &str) -> bool {
        if !self.registry.is_active(name) {
            return true;
        }

        let host = &self.host;
        let module = match self.registry.get_mut(name) {
            Some(module) => module,
            None => return false,
        };

        let deactivated = guarded(host.logger.as_ref(), module, "deactivate", |m| m.on_deactivate(host))
            .unwrap_or(false);
        if !deactivated {
            let reason = module.status().last_error().unwrap_or("unknown error").to_string();
            host.logger.log_error(&format!("Module '{}' failed to deactivate: {}", name, reason));
            return false;
        }

        let retracted = self.dispatcher.unregister_owner(name);
        debug!("Module '{}' deactivated, {} commands retracted", name, retracted);
        self.registry.mark_inactive(name);
        true
    }

    /// Persist `name` in the enablement list. After bootstrap the module is
    /// also activated immediately and must be registered.
    pub fn enable_module(&mut self, name: &str) -> bool {
        if self.bootstrapped && !self.registry.is_known(name) {
            self.host.logger.log_error(&ModuleError::not_found(name).to_string());
            return false;
        }

        if let Err(e) = self.enablement.enable(name) {
            self.host.logger.log_error(&format!("Failed to enable module '{}': {}", name, e));
            return false;
        }

        if self.bootstrapped {
            return self.activate_module(name);
        }
        true
    }

    /// Remove `name` from the enablement list, deactivating it if active
    pub fn disable_module(&mut self, name: &str) -> bool {
        if let Err(e) = self.enablement.disable(name) {
            self.host.logger.log_error(&format!("Failed to disable module '{}': {}", name, e));
            return false;
        }

        if self.registry.is_active(name) {
            return self.deactivate_module(name);
        }
        true
    }

    /// Deactivate active modules in reverse activation order, clean up
    /// every initialized module, then empty the registry.
    pub fn cleanup(&mut self) {
        for name in self.registry.active_names().into_iter().rev() {
            self.deactivate_module(&name);
        }

        let host = &self.host;
        for name in self.registry.initialized_names() {
            if let Some(module) = self.registry.get_mut(&name) {
                guarded(host.logger.as_ref(), module, "cleanup", |m| m.cleanup());
            }
        }

        self.dispatcher.clear();
        self.registry.clear();
        self.bootstrapped = false;
        debug!("Module manager cleaned up");
    }

    /// Status of every registered module, keyed by name
    pub fn get_modules_status(&self) -> BTreeMap<String, ModuleReport> {
        self.registry.iter()
            .map(|(name, module)| {
                let report = ModuleReport {
                    info: module.module_info().clone(),
                    status: module.status().clone(),
                    initialized: self.registry.is_initialized(name),
                    active: self.registry.is_active(name),
                };
                (name.clone(), report)
            })
            .collect()
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.registry.is_known(name)
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.registry.is_initialized(name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.registry.is_active(name)
    }

    pub fn module(&self, name: &str) -> Option<&dyn Module> {
        self.registry.get(name)
    }

    /// The persisted enablement list
    pub fn enabled_modules(&self) -> Vec<String> {
        self.enablement.names()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enablement.contains(name)
    }

    /// Set one configuration value on a registered module. The candidate
    /// configuration must pass the module's validation; with `persist` the
    /// result is also saved as the module's override.
    pub fn configure_module(&mut self, name: &str, key: &str, value: Value, persist: bool) -> bool {
        let host = &self.host;
        let prefix = &self.settings.option_prefix;
        let module = match self.registry.get_mut(name) {
            Some(module) => module,
            None => {
                host.logger.log_error(&ModuleError::not_found(name).to_string());
                return false;
            }
        };

        let mut candidate = module.config().clone();
        candidate.set_value(key, value.clone());
        if !module.validate_config(&candidate) {
            host.logger.log_error(&ModuleError::invalid_config(format!(
                "Rejected value for '{}.{}'", name, key
            )).to_string());
            return false;
        }

        module.set_config_value(key, value);
        if persist && !module.save_config(host.options.as_ref(), prefix) {
            let reason = module.status().last_error().unwrap_or("unknown error").to_string();
            host.logger.log_error(&format!("Module '{}' configuration not saved: {}", name, reason));
            return false;
        }
        true
    }

    /// Route a request through the dispatcher
    pub fn dispatch(&self, request: &CommandRequest, caller: Arc<dyn CallerAuth>) -> Envelope {
        self.dispatcher.handle(request, caller)
    }
}

/// Run one module call, catching a panic that escapes it. The fault is
/// logged and recorded on the module; the call yields `None`.
fn guarded<T, F>(logger: &dyn LogSink, module: &mut Box<dyn Module>, operation: &str, call: F) -> Option<T>
where
    F: FnOnce(&mut Box<dyn Module>) -> T,
{
    match panic::catch_unwind(AssertUnwindSafe(|| call(&mut *module))) {
        Ok(result) => Some(result),
        Err(payload) => {
            let message = format!(
                "Module '{}' {} fault: {}",
                module.module_info().name,
                operation,
                panic_message(payload.as_ref())
            );
            logger.log_error(&message);
            module.record_error(message);
            None
        }
    }
}
