//! Module Discovery
//!
//! Sources that hand the manager a name -> module mapping. How modules are
//! located is up to the source; the manager only registers what it returns.

use std::collections::BTreeMap;
use super::builtin;
use super::error::{ModuleError, ModuleResult};
use super::traits::Module;

/// Discovered modules keyed by registration name
pub type DiscoveredModules = BTreeMap<String, Box<dyn Module>>;

/// Factory producing a fresh module instance per bootstrap
pub type ModuleFactory = Box<dyn Fn() -> Box<dyn Module> + Send + Sync>;

pub trait ModuleDiscovery: Send + Sync {
    fn discover(&self) -> ModuleResult<DiscoveredModules>;
}

/// The modules shipped with this crate
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDiscovery;

impl ModuleDiscovery for BuiltinDiscovery {
    fn discover(&self) -> ModuleResult<DiscoveredModules> {
        collect(builtin::builtin_modules())
    }
}

/// Caller-provided factories, keyed by each module's declared name
#[derive(Default)]
pub struct StaticDiscovery {
    factories: Vec<ModuleFactory>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        self.factories.push(Box::new(factory));
        self
    }

    /// Builtin modules followed by the given factories
    pub fn with_builtins(self) -> Self {
        self.with_module(|| builtin::dashboard())
            .with_module(|| builtin::cache())
            .with_module(|| builtin::debug_log())
    }
}

impl ModuleDiscovery for StaticDiscovery {
    fn discover(&self) -> ModuleResult<DiscoveredModules> {
        collect(self.factories.iter().map(|factory| factory()).collect())
    }
}

/// Key modules by name; two modules claiming one name is a discovery fault
fn collect(modules: Vec<Box<dyn Module>>) -> ModuleResult<DiscoveredModules> {
    let mut discovered = DiscoveredModules::new();
    for module in modules {
        let name = module.module_info().name.clone();
        if discovered.contains_key(&name) {
            return Err(ModuleError::discovery(format!("Module '{}' discovered more than once", name)));
        }
        discovered.insert(name, module);
    }
    Ok(discovered)
}
