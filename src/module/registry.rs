//! Module Registry
//!
//! Sole owner of registered modules. Tracks three views over one name
//! space and enforces `active ⊆ initialized ⊆ known` on every mutation.

use std::collections::BTreeMap;
use super::error::{ModuleError, ModuleResult};
use super::traits::Module;

/// Known, initialized and active module collections
#[derive(Default)]
pub struct ModuleRegistry {
    /// Registered modules by name
    known: BTreeMap<String, Box<dyn Module>>,

    /// Successfully initialized, in initialization order
    initialized: Vec<String>,

    /// Currently active, in activation order
    active: Vec<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. A name already present is rejected and the
    /// existing module is kept.
    pub fn register(&mut self, name: &str, module: Box<dyn Module>) -> ModuleResult<()> {
        if self.known.contains_key(name) {
            return Err(ModuleError::already_registered(name));
        }
        self.known.insert(name.to_string(), module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Module> {
        self.known.get(name).map(|m| m.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn Module>> {
        self.known.get_mut(name)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains_key(name)
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.initialized.iter().any(|n| n == name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|n| n == name)
    }

    pub fn mark_initialized(&mut self, name: &str) -> ModuleResult<()> {
        if !self.is_known(name) {
            return Err(ModuleError::not_found(name));
        }
        if !self.is_initialized(name) {
            self.initialized.push(name.to_string());
        }
        Ok(())
    }

    pub fn mark_active(&mut self, name: &str) -> ModuleResult<()> {
        if !self.is_initialized(name) {
            return Err(ModuleError::lifecycle_state(format!(
                "Module '{}' cannot be active before it is initialized", name
            )));
        }
        if !self.is_active(name) {
            self.active.push(name.to_string());
        }
        Ok(())
    }

    pub fn mark_inactive(&mut self, name: &str) {
        self.active.retain(|n| n != name);
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.known.keys().cloned().collect()
    }

    pub fn initialized_names(&self) -> Vec<String> {
        self.initialized.clone()
    }

    pub fn active_names(&self) -> Vec<String> {
        self.active.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Box<dyn Module>)> {
        self.known.iter()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn initialized_count(&self) -> usize {
        self.initialized.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// `active ⊆ initialized ⊆ known`
    pub fn invariants_hold(&self) -> bool {
        self.initialized.iter().all(|n| self.known.contains_key(n))
            && self.active.iter().all(|n| self.is_initialized(n))
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.initialized.clear();
        self.known.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::tests::mock_modules::MockModule;

    #[test]
    fn test_registry_basic_operations() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.is_empty());

        registry.register("dashboard", MockModule::new("dashboard").boxed()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.is_known("dashboard"));
        assert!(registry.get("dashboard").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["dashboard".to_string()]);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = ModuleRegistry::new();
        registry.register("cache", MockModule::new("cache").with_title("first").boxed()).unwrap();

        let result = registry.register("cache", MockModule::new("cache").with_title("second").boxed());
        assert!(matches!(result, Err(ModuleError::AlreadyRegistered { .. })));
        assert_eq!(registry.get("cache").unwrap().module_info().title, "first");
    }

    #[test]
    fn test_collection_invariants_enforced() {
        let mut registry = ModuleRegistry::new();

        assert!(matches!(registry.mark_initialized("ghost"), Err(ModuleError::NotFound { .. })));

        registry.register("cache", MockModule::new("cache").boxed()).unwrap();
        assert!(matches!(registry.mark_active("cache"), Err(ModuleError::LifecycleState { .. })));

        registry.mark_initialized("cache").unwrap();
        registry.mark_initialized("cache").unwrap();
        assert_eq!(registry.initialized_count(), 1);

        registry.mark_active("cache").unwrap();
        assert!(registry.is_active("cache"));
        assert!(registry.invariants_hold());

        registry.mark_inactive("cache");
        assert!(!registry.is_active("cache"));
        assert!(registry.is_initialized("cache"));

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.active_count(), 0);
    }
}
