//! Dispatcher Error Types

use thiserror::Error;

/// Result type for dispatcher operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Reasons a dispatched command short-circuits to an error envelope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Missing or invalid anti-forgery token
    #[error("Authentication failed: invalid or missing security token")]
    Authentication,

    /// Caller lacks the required capability
    #[error("Authorization failed: capability '{capability}' required")]
    Authorization { capability: String },

    /// No handler registered under the command name
    #[error("Unknown command: {command}")]
    CommandNotFound { command: String },

    /// Handler returned an error or panicked
    #[error("Command '{command}' failed: {message}")]
    HandlerExecution { command: String, message: String },

    /// Command name already owned by another registration
    #[error("Command already registered: {command} (owned by {owner})")]
    AlreadyRegistered { command: String, owner: String },
}

impl DispatchError {
    pub fn authorization<S: Into<String>>(capability: S) -> Self {
        Self::Authorization { capability: capability.into() }
    }

    pub fn command_not_found<S: Into<String>>(command: S) -> Self {
        Self::CommandNotFound { command: command.into() }
    }

    pub fn handler_execution<C: Into<String>, M: Into<String>>(command: C, message: M) -> Self {
        Self::HandlerExecution { command: command.into(), message: message.into() }
    }

    pub fn already_registered<C: Into<String>, O: Into<String>>(command: C, owner: O) -> Self {
        Self::AlreadyRegistered { command: command.into(), owner: owner.into() }
    }

    /// Failures caused by who is calling rather than what was called
    pub fn is_access_denied(&self) -> bool {
        matches!(self, DispatchError::Authentication | DispatchError::Authorization { .. })
    }
}
