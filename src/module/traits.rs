//! Module Contract
//!
//! The uniform shape every feature unit exposes so the registry can treat
//! all modules polymorphically.

use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::command::Command;
use crate::host::{Dependency, HostServices, OptionStore};
use super::config::ModuleConfig;
use super::version::MODULE_API_VERSION;

/// Lifecycle contract implemented by every module.
///
/// Lifecycle methods return `false` for expected failures (missing
/// dependency, invalid config) after appending a reason to the module's
/// error list; they are not expected to panic, and the registry catches
/// and logs any panic that does escape.
pub trait Module: Send {
    /// Static metadata: name, requirements, dependencies
    fn module_info(&self) -> &ModuleInfo;

    /// One-time setup against the host services
    fn initialize(&mut self, host: &HostServices) -> bool;

    /// Precondition check: required capabilities and declared dependencies.
    /// Touches nothing outside the module's own status.
    fn can_run(&mut self, host: &HostServices) -> bool;

    /// Transition to active; attaches host hooks
    fn on_activate(&mut self, host: &HostServices) -> bool;

    /// Transition to inactive; detaches host hooks
    fn on_deactivate(&mut self, host: &HostServices) -> bool;

    /// Release everything acquired during initialize/activate. Always ends
    /// in the `cleaned` state.
    fn cleanup(&mut self);

    fn status(&self) -> &ModuleStatus;

    /// Append a fault observed outside the module (e.g. a caught panic)
    fn record_error(&mut self, error: String);

    fn default_config(&self) -> ModuleConfig;

    fn validate_config(&self, config: &ModuleConfig) -> bool;

    /// Commands this module contributes to the dispatcher while active
    fn commands(&self) -> Vec<Command> {
        Vec::new()
    }

    /// Merged in-memory configuration
    fn config(&self) -> &ModuleConfig;

    fn get_config_value(&self, key: &str, default: Value) -> Value {
        self.config().get_value(key, default)
    }

    /// Update the in-memory configuration only; see [`Module::save_config`]
    fn set_config_value(&mut self, key: &str, value: Value);

    /// Persist the in-memory configuration as this module's override
    fn save_config(&mut self, options: &dyn OptionStore, prefix: &str) -> bool;
}

/// Module metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Unique key
    pub name: String,

    /// Human-readable name
    pub title: String,

    pub description: String,

    pub version: String,

    /// Module contract version this module targets (YYYYMMDD)
    pub api_version: u32,

    /// Capabilities the bootstrapping caller must hold
    pub required_capabilities: Vec<String>,

    pub dependencies: Vec<Dependency>,
}

impl ModuleInfo {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, title: T) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: String::new(),
            version: "1.0.0".to_string(),
            api_version: MODULE_API_VERSION,
            required_capabilities: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_api_version(mut self, api_version: u32) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn with_capability<S: Into<String>>(mut self, capability: S) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Same major version (year) is compatible
    pub fn is_compatible_with_api(&self, api_version: u32) -> bool {
        self.api_version / 10000 == api_version / 10000
    }
}

/// Where a module is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Registered,
    CannotRun,
    InvalidConfig,
    InitFailed,
    Initialized,
    Active,
    Inactive,
    Error,
    Cleaned,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Registered => "registered",
            Self::CannotRun => "cannot_run",
            Self::InvalidConfig => "invalid_config",
            Self::InitFailed => "init_failed",
            Self::Initialized => "initialized",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Error => "error",
            Self::Cleaned => "cleaned",
        };
        f.write_str(label)
    }
}

/// Mutable status record of a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub active: bool,
    pub initialized: bool,
    pub state: ModuleState,
    pub errors: Vec<String>,
}

impl Default for ModuleStatus {
    fn default() -> Self {
        Self {
            active: false,
            initialized: false,
            state: ModuleState::Registered,
            errors: Vec::new(),
        }
    }
}

impl ModuleStatus {
    pub fn record_error<S: Into<String>>(&mut self, error: S) {
        self.errors.push(error.into());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str)
    }
}
