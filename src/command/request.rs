//! Inbound Requests
//!
//! The wire request and the explicit per-request context the dispatcher
//! authenticates and authorizes against.

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::host::CallerAuth;

/// Wire request: `{command, payload, token}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default = "empty_payload")]
    pub payload: Value,
    #[serde(default)]
    pub token: String,
}

fn empty_payload() -> Value {
    Value::Object(serde_json::Map::new())
}

impl CommandRequest {
    pub fn new<C: Into<String>, T: Into<String>>(command: C, payload: Value, token: T) -> Self {
        Self {
            command: command.into(),
            payload,
            token: token.into(),
        }
    }
}

/// Who is calling and with which anti-forgery token
#[derive(Clone)]
pub struct RequestContext {
    pub token: String,
    pub caller: Arc<dyn CallerAuth>,
}

impl RequestContext {
    pub fn new<T: Into<String>>(token: T, caller: Arc<dyn CallerAuth>) -> Self {
        Self { token: token.into(), caller }
    }

    pub fn from_request(request: &CommandRequest, caller: Arc<dyn CallerAuth>) -> Self {
        Self::new(request.token.clone(), caller)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.caller.caller_has_capability(capability)
    }

    pub fn verify_token(&self, action: &str) -> bool {
        self.caller.verify_token(&self.token, action)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("has_token", &!self.token.is_empty())
            .finish()
    }
}
