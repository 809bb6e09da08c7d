//! Module System
//!
//! Lifecycle registry for self-contained feature modules: discovery,
//! capability and dependency preconditions, persisted enablement, and
//! registration of each active module's commands with the dispatcher.

pub mod error;
pub mod version;
pub mod traits;
pub mod config;
pub mod base;
pub mod enablement;
pub mod registry;
pub mod discovery;
pub mod manager;
pub mod builtin;

#[cfg(test)]
pub mod tests;

pub use error::{ModuleError, ModuleResult};
pub use version::{get_api_version, MODULE_API_VERSION};
pub use traits::{Module, ModuleInfo, ModuleState, ModuleStatus};
pub use config::ModuleConfig;
pub use base::{ManagedModule, ModuleBase, ModuleBehavior};
pub use enablement::{enabled_modules_option, module_config_option, EnablementList, DEFAULT_OPTION_PREFIX};
pub use registry::ModuleRegistry;
pub use discovery::{BuiltinDiscovery, DiscoveredModules, ModuleDiscovery, ModuleFactory, StaticDiscovery};
pub use manager::{ManagerSettings, ModuleManager, ModuleReport, DEFAULT_CORE_MODULES};
