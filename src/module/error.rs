//! Module Error Types
//!
//! Error taxonomy for module registration and lifecycle operations. These
//! are caught at the registry boundary, logged, recorded into the module's
//! status, and converted into boolean results.

use thiserror::Error;
use crate::host::{Dependency, HostError};

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Error types for module operations
#[derive(Error, Debug, Clone)]
pub enum ModuleError {
    /// Module name already present in the registry
    #[error("Module already registered: {name}")]
    AlreadyRegistered { name: String },

    /// Module name unknown to the registry
    #[error("Module not found: {name}")]
    NotFound { name: String },

    /// A declared dependency cannot be resolved by the host
    #[error("Missing required dependency: {dependency}")]
    DependencyMissing { dependency: String },

    /// The caller lacks a capability the module requires
    #[error("Missing required capability: {capability}")]
    CapabilityDenied { capability: String },

    /// Merged configuration failed validation
    #[error("Invalid module configuration: {message}")]
    InvalidConfig { message: String },

    /// Operation not allowed in the module's current state
    #[error("Invalid lifecycle state: {message}")]
    LifecycleState { message: String },

    /// Fault raised inside module code
    #[error("Module execution fault: {message}")]
    HandlerExecution { message: String },

    /// Module discovery failed
    #[error("Module discovery failed: {message}")]
    Discovery { message: String },

    /// Module targets an incompatible API version
    #[error("Version compatibility error: {message}")]
    VersionIncompatible { message: String },

    /// Persisted option store failure
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl ModuleError {
    pub fn already_registered<S: Into<String>>(name: S) -> Self {
        Self::AlreadyRegistered { name: name.into() }
    }

    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn dependency_missing(dependency: &Dependency) -> Self {
        Self::DependencyMissing { dependency: dependency.to_string() }
    }

    pub fn capability_denied<S: Into<String>>(capability: S) -> Self {
        Self::CapabilityDenied { capability: capability.into() }
    }

    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    pub fn lifecycle_state<S: Into<String>>(message: S) -> Self {
        Self::LifecycleState { message: message.into() }
    }

    pub fn handler_execution<S: Into<String>>(message: S) -> Self {
        Self::HandlerExecution { message: message.into() }
    }

    pub fn discovery<S: Into<String>>(message: S) -> Self {
        Self::Discovery { message: message.into() }
    }

    pub fn version_incompatible<S: Into<String>>(message: S) -> Self {
        Self::VersionIncompatible { message: message.into() }
    }

    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Failures reported by `can_run`
    pub fn is_precondition_failure(&self) -> bool {
        matches!(self,
            ModuleError::DependencyMissing { .. } |
            ModuleError::CapabilityDenied { .. }
        )
    }

    /// Failures tied to registration or state transitions
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(self,
            ModuleError::AlreadyRegistered { .. } |
            ModuleError::NotFound { .. } |
            ModuleError::LifecycleState { .. } |
            ModuleError::VersionIncompatible { .. }
        )
    }
}

impl From<HostError> for ModuleError {
    fn from(err: HostError) -> Self {
        ModuleError::storage(err.to_string())
    }
}

/// Render a panic payload caught with `catch_unwind` as a message
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ModuleError::not_found("cache").to_string(), "Module not found: cache");
        assert_eq!(
            ModuleError::dependency_missing(&Dependency::function("nonexistent_fn")).to_string(),
            "Missing required dependency: function:nonexistent_fn"
        );
        assert_eq!(
            ModuleError::capability_denied("manage_options").to_string(),
            "Missing required capability: manage_options"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(ModuleError::capability_denied("x").is_precondition_failure());
        assert!(ModuleError::dependency_missing(&Dependency::type_name("T")).is_precondition_failure());
        assert!(!ModuleError::invalid_config("bad").is_precondition_failure());

        assert!(ModuleError::already_registered("x").is_lifecycle_error());
        assert!(ModuleError::lifecycle_state("not initialized").is_lifecycle_error());
        assert!(!ModuleError::storage("disk").is_lifecycle_error());
    }

    #[test]
    fn test_host_error_conversion() {
        let err: ModuleError = HostError::storage("disk full").into();
        assert!(matches!(err, ModuleError::Storage { .. }));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("kaboom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "kaboom");

        let payload = std::panic::catch_unwind(|| panic!("{} {}", "formatted", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 1");
    }
}
