//! Response Envelope
//!
//! Uniform success/error wrapper returned for every dispatched command.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `{success: true, data: <result>}` or `{success: false, data: {message}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub data: Value,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self { success: true, data }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            data: json!({ "message": message.into() }),
        }
    }

    /// Error message, if this is an error envelope
    pub fn message(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.data.get("message").and_then(Value::as_str)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"data":{"message":"Failed to serialize response"}}"#.to_string()
        })
    }
}
