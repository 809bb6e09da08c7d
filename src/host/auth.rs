//! Caller Authorization
//!
//! A fixed-capability caller used by the binary and by tests.

use std::collections::{HashMap, HashSet};
use super::traits::CallerAuth;

/// Caller holding a fixed capability set and one valid token per action
#[derive(Debug, Clone, Default)]
pub struct StaticCaller {
    capabilities: HashSet<String>,
    tokens: HashMap<String, String>,
}

impl StaticCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capability<S: Into<String>>(mut self, capability: S) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(capabilities.into_iter().map(Into::into));
        self
    }

    /// Accept `token` for `action`
    pub fn with_token<A: Into<String>, T: Into<String>>(mut self, action: A, token: T) -> Self {
        self.tokens.insert(action.into(), token.into());
        self
    }
}

impl CallerAuth for StaticCaller {
    fn caller_has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    fn verify_token(&self, token: &str, action: &str) -> bool {
        match self.tokens.get(action) {
            Some(expected) => !token.is_empty() && expected == token,
            None => false,
        }
    }
}
