//! Command Handlers
//!
//! A command is a named operation a module contributes while it is active.

use std::fmt;
use std::sync::Arc;
use serde_json::Value;

/// Handler invoked with the request payload
pub type CommandHandler = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// A dispatchable command
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub handler: CommandHandler,
    /// Capability required on top of the dispatcher's default, if any
    pub capability: Option<String>,
    pub description: String,
}

impl Command {
    pub fn new<S, F>(name: S, handler: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            capability: None,
            description: String::new(),
        }
    }

    pub fn with_capability<S: Into<String>>(mut self, capability: S) -> Self {
        self.capability = Some(capability.into());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .field("description", &self.description)
            .finish()
    }
}
