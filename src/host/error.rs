//! Host Collaborator Errors
//!
//! Failures raised by the reference implementations of the host interfaces.

use thiserror::Error;

/// Result type for host collaborator operations
pub type HostResult<T> = Result<T, HostError>;

/// Errors surfaced by host collaborators (option store, environment)
#[derive(Error, Debug, Clone)]
pub enum HostError {
    /// Persisted option store could not be read or written
    #[error("Option store error: {message}")]
    Storage { message: String },

    /// Value could not be (de)serialized
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Dependency reference could not be parsed
    #[error("Invalid dependency reference: {reference}")]
    InvalidDependency { reference: String },
}

impl HostError {
    /// Create a storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization { message: message.into() }
    }

    /// Create an invalid dependency error
    pub fn invalid_dependency<S: Into<String>>(reference: S) -> Self {
        Self::InvalidDependency { reference: reference.into() }
    }
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        HostError::storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::serialization(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = HostError::invalid_dependency("bogus:thing");
        assert_eq!(error.to_string(), "Invalid dependency reference: bogus:thing");
    }

    #[test]
    fn test_io_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let host_error: HostError = io_error.into();
        assert!(matches!(host_error, HostError::Storage { .. }));
        assert!(host_error.to_string().contains("IO error"));
    }
}
