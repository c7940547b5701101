//! Tool-call request/result contract
//!
//! Results are plain strings the remote agent can read aloud or reason over.
//! Failures are strings beginning with [`ERROR_PREFIX`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Prefix of every failed tool result
pub const ERROR_PREFIX: &str = "ERROR:";

/// Agent-invoked tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Transport-assigned call id, when the transport provides one
    #[serde(default)]
    pub call_id: Option<String>,
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(tool_name: impl Into<String>, parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            call_id: None,
            tool_name: tool_name.into(),
            parameters,
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }
}

/// String result returned to the remote agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCallResult(String);

impl ToolCallResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn error(reason: impl fmt::Display) -> Self {
        Self(format!("{} {}", ERROR_PREFIX, reason))
    }

    pub fn is_error(&self) -> bool {
        self.0.starts_with(ERROR_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ToolCallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_result_has_prefix() {
        let result = ToolCallResult::error("inventory store offline");
        assert!(result.is_error());
        assert_eq!(result.as_str(), "ERROR: inventory store offline");
    }

    #[test]
    fn test_success_result_is_not_error() {
        assert!(!ToolCallResult::success("Added 2 milk to the cart.").is_error());
    }

    #[test]
    fn test_request_accepts_null_parameters() {
        let request = ToolCallRequest::new("navigate_to", Value::Null);
        assert!(request.parameters.is_empty());

        let request = ToolCallRequest::new("check_inventory", json!({"query": "milk"}));
        assert_eq!(request.parameters["query"], "milk");
    }
}
