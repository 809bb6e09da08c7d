//! Module Base Template
//!
//! Shared lifecycle plumbing. A concrete module implements only
//! [`ModuleBehavior`] (its specific hooks) and is wrapped in
//! [`ManagedModule`], which embeds a [`ModuleBase`] for status tracking,
//! configuration merging and precondition checks.
//!
//! Hook results map onto states as follows:
//! - `can_run` false -> `cannot_run`
//! - `validate_module_config` error -> `invalid_config`
//! - `initialize_module` error -> `init_failed`
//! - a panic anywhere in the sequence -> `error`

use std::panic::{self, AssertUnwindSafe};
use log::debug;
use serde_json::Value;
use crate::command::Command;
use crate::host::{HostServices, OptionStore};
use super::config::ModuleConfig;
use super::enablement::{module_config_option, option_prefix};
use super::error::{panic_message, ModuleError, ModuleResult};
use super::traits::{Module, ModuleInfo, ModuleState, ModuleStatus};

/// Module-specific behavior plugged into the base template
pub trait ModuleBehavior: Send {
    fn info(&self) -> ModuleInfo;

    fn default_config(&self) -> ModuleConfig {
        ModuleConfig::new()
    }

    fn validate_module_config(&self, _config: &ModuleConfig) -> ModuleResult<()> {
        Ok(())
    }

    fn initialize_module(&mut self, _config: &ModuleConfig, _host: &HostServices) -> ModuleResult<()> {
        Ok(())
    }

    fn activate_module(&mut self, _config: &ModuleConfig, _host: &HostServices) -> ModuleResult<()> {
        Ok(())
    }

    fn deactivate_module(&mut self, _host: &HostServices) -> ModuleResult<()> {
        Ok(())
    }

    fn cleanup_module(&mut self) {}

    fn commands(&self, _config: &ModuleConfig) -> Vec<Command> {
        Vec::new()
    }
}

/// Status, configuration and host handle shared by every managed module
#[derive(Clone)]
pub struct ModuleBase {
    info: ModuleInfo,
    status: ModuleStatus,
    config: ModuleConfig,
    host: Option<HostServices>,
}

impl ModuleBase {
    pub fn new(info: ModuleInfo) -> Self {
        Self {
            info,
            status: ModuleStatus::default(),
            config: ModuleConfig::new(),
            host: None,
        }
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    pub fn status(&self) -> &ModuleStatus {
        &self.status
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Host services captured during `initialize`
    pub fn host(&self) -> Option<&HostServices> {
        self.host.as_ref()
    }

    pub fn get_config_value(&self, key: &str, default: Value) -> Value {
        self.config.get_value(key, default)
    }

    pub fn set_config_value(&mut self, key: &str, value: Value) {
        self.config.set_value(key, value);
    }

    pub fn save_config(&mut self, options: &dyn OptionStore, prefix: &str) -> bool {
        let option = module_config_option(prefix, &self.info.name);
        match options.update_option(&option, self.config.to_value()) {
            Ok(()) => true,
            Err(e) => {
                self.status.record_error(format!("Failed to save configuration: {}", e));
                false
            }
        }
    }

    pub fn record_error(&mut self, error: String) {
        self.status.state = ModuleState::Error;
        self.status.record_error(error);
    }

    fn fail(&mut self, state: ModuleState, error: &ModuleError) {
        debug!("Module '{}' -> {}: {}", self.info.name, state, error);
        self.status.state = state;
        self.status.record_error(error.to_string());
    }

    /// Check required capabilities (skipped under a test-execution context)
    /// and declared dependencies. Stops at the first unmet requirement.
    pub fn can_run(&mut self, host: &HostServices) -> bool {
        match self.check_requirements(host) {
            Ok(()) => true,
            Err(e) => {
                self.status.record_error(e.to_string());
                false
            }
        }
    }

    fn check_requirements(&self, host: &HostServices) -> ModuleResult<()> {
        if !host.execution.is_testing() {
            for capability in &self.info.required_capabilities {
                if !host.caller.caller_has_capability(capability) {
                    return Err(ModuleError::capability_denied(capability));
                }
            }
        }

        for dependency in &self.info.dependencies {
            if !host.dependencies.is_available(dependency) {
                return Err(ModuleError::dependency_missing(dependency));
            }
        }

        Ok(())
    }

    pub fn initialize<B: ModuleBehavior>(&mut self, behavior: &mut B, host: &HostServices) -> bool {
        if self.status.initialized {
            return true;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_initialize(behavior, host)));
        match outcome {
            Ok(initialized) => initialized,
            Err(payload) => {
                let fault = ModuleError::handler_execution(panic_message(payload.as_ref()));
                self.fail(ModuleState::Error, &fault);
                false
            }
        }
    }

    fn run_initialize<B: ModuleBehavior>(&mut self, behavior: &mut B, host: &HostServices) -> bool {
        self.host = Some(host.clone());

        if !self.can_run(host) {
            self.status.state = ModuleState::CannotRun;
            return false;
        }

        let prefix = option_prefix(host.config.as_ref());
        let overrides = host.options
            .get_option(&module_config_option(&prefix, &self.info.name))
            .map(ModuleConfig::from_value)
            .unwrap_or_default();
        self.config = ModuleConfig::merged(&behavior.default_config(), &overrides);

        if let Err(e) = behavior.validate_module_config(&self.config) {
            self.fail(ModuleState::InvalidConfig, &e);
            return false;
        }

        if let Err(e) = behavior.initialize_module(&self.config, host) {
            self.fail(ModuleState::InitFailed, &e);
            return false;
        }

        self.status.initialized = true;
        self.status.state = ModuleState::Initialized;
        debug!("Module '{}' initialized", self.info.name);
        true
    }

    pub fn on_activate<B: ModuleBehavior>(&mut self, behavior: &mut B, host: &HostServices) -> bool {
        if self.status.active {
            return true;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> ModuleResult<()> {
            if !self.status.initialized {
                return Err(ModuleError::lifecycle_state(format!(
                    "Module '{}' must be initialized before activation", self.info.name
                )));
            }
            behavior.activate_module(&self.config, host)
        }));

        match outcome {
            Ok(Ok(())) => {
                self.status.active = true;
                self.status.state = ModuleState::Active;
                true
            }
            Ok(Err(e)) => {
                self.fail(ModuleState::Error, &e);
                false
            }
            Err(payload) => {
                let fault = ModuleError::handler_execution(panic_message(payload.as_ref()));
                self.fail(ModuleState::Error, &fault);
                false
            }
        }
    }

    pub fn on_deactivate<B: ModuleBehavior>(&mut self, behavior: &mut B, host: &HostServices) -> bool {
        if !self.status.active {
            return true;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| behavior.deactivate_module(host)));
        match outcome {
            Ok(Ok(())) => {
                self.status.active = false;
                self.status.state = ModuleState::Inactive;
                true
            }
            Ok(Err(e)) => {
                self.fail(ModuleState::Error, &e);
                false
            }
            Err(payload) => {
                let fault = ModuleError::handler_execution(panic_message(payload.as_ref()));
                self.fail(ModuleState::Error, &fault);
                false
            }
        }
    }

    pub fn cleanup<B: ModuleBehavior>(&mut self, behavior: &mut B) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| behavior.cleanup_module())) {
            self.status.record_error(format!("Cleanup fault: {}", panic_message(payload.as_ref())));
        }
        // Hooks attached on activation outlive a deactivation that never ran
        if let Some(host) = self.host.take() {
            let detached = host.hooks.remove_hooks(&self.info.name);
            if detached > 0 {
                debug!("Module '{}' detached {} hooks on cleanup", self.info.name, detached);
            }
        }
        self.status.active = false;
        self.status.initialized = false;
        self.status.state = ModuleState::Cleaned;
    }
}

/// A [`ModuleBehavior`] wrapped with the base template; implements [`Module`]
pub struct ManagedModule<B: ModuleBehavior> {
    base: ModuleBase,
    behavior: B,
}

impl<B: ModuleBehavior + 'static> ManagedModule<B> {
    pub fn new(behavior: B) -> Self {
        Self {
            base: ModuleBase::new(behavior.info()),
            behavior,
        }
    }

    pub fn boxed(behavior: B) -> Box<dyn Module> {
        Box::new(Self::new(behavior))
    }

    pub fn base(&self) -> &ModuleBase {
        &self.base
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }
}

impl<B: ModuleBehavior + 'static> Module for ManagedModule<B> {
    fn module_info(&self) -> &ModuleInfo {
        self.base.info()
    }

    fn initialize(&mut self, host: &HostServices) -> bool {
        self.base.initialize(&mut self.behavior, host)
    }

    fn can_run(&mut self, host: &HostServices) -> bool {
        self.base.can_run(host)
    }

    fn on_activate(&mut self, host: &HostServices) -> bool {
        self.base.on_activate(&mut self.behavior, host)
    }

    fn on_deactivate(&mut self, host: &HostServices) -> bool {
        self.base.on_deactivate(&mut self.behavior, host)
    }

    fn cleanup(&mut self) {
        self.base.cleanup(&mut self.behavior)
    }

    fn status(&self) -> &ModuleStatus {
        self.base.status()
    }

    fn record_error(&mut self, error: String) {
        self.base.record_error(error)
    }

    fn default_config(&self) -> ModuleConfig {
        self.behavior.default_config()
    }

    fn validate_config(&self, config: &ModuleConfig) -> bool {
        self.behavior.validate_module_config(config).is_ok()
    }

    fn commands(&self) -> Vec<Command> {
        self.behavior.commands(self.base.config())
    }

    fn config(&self) -> &ModuleConfig {
        self.base.config()
    }

    fn set_config_value(&mut self, key: &str, value: Value) {
        self.base.set_config_value(key, value)
    }

    fn save_config(&mut self, options: &dyn OptionStore, prefix: &str) -> bool {
        self.base.save_config(options, prefix)
    }
}
