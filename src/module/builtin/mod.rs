//! Builtin Modules
//!
//! Feature units shipped with the panel. `dashboard` is the core module;
//! the others are activated through the enablement list.

pub mod dashboard;
pub mod cache;
pub mod debug_log;

pub use dashboard::DashboardModule;
pub use cache::CacheModule;
pub use debug_log::DebugLogModule;

use super::base::ManagedModule;
use super::traits::Module;

pub fn dashboard() -> Box<dyn Module> {
    ManagedModule::boxed(DashboardModule::new())
}

pub fn cache() -> Box<dyn Module> {
    ManagedModule::boxed(CacheModule::new())
}

pub fn debug_log() -> Box<dyn Module> {
    ManagedModule::boxed(DebugLogModule::new())
}

/// Fresh instances of every builtin module
pub fn builtin_modules() -> Vec<Box<dyn Module>> {
    vec![dashboard(), cache(), debug_log()]
}
