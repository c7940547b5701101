//! Agent-invokable tool interface
//!
//! Each tool declares an explicit parameter schema at registration time.
//! Parameters arriving from the remote agent are validated against it before
//! the handler runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::ToolError;

/// Named parameters of one tool call
pub type ToolParameters = Map<String, Value>;

/// Parameter value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.is_finite() && n.fract() == 0.0)
            }
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
        }
    }
}

/// Schema of a single parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PropertySchema {
    fn of(param_type: ParamType, description: &str) -> Self {
        Self {
            param_type,
            description: description.to_string(),
            enum_values: None,
            default: None,
        }
    }

    pub fn string(description: &str) -> Self {
        Self::of(ParamType::String, description)
    }

    pub fn integer(description: &str) -> Self {
        Self::of(ParamType::Integer, description)
    }

    pub fn number(description: &str) -> Self {
        Self::of(ParamType::Number, description)
    }

    pub fn boolean(description: &str) -> Self {
        Self::of(ParamType::Boolean, description)
    }

    pub fn array(description: &str) -> Self {
        Self::of(ParamType::Array, description)
    }

    /// String parameter restricted to a fixed set of values
    pub fn enumeration(description: &str, values: &[&str]) -> Self {
        let mut schema = Self::string(description);
        schema.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        schema
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Parameter shape of a tool: field name to type plus required/optional
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSchema {
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

impl InputSchema {
    pub fn object() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: &str, schema: PropertySchema, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Check required fields, value types and enum membership
    ///
    /// Unknown fields are tolerated; the remote agent sometimes adds extras.
    pub fn validate(&self, params: &ToolParameters) -> Result<(), ToolError> {
        for name in &self.required {
            match params.get(name) {
                None | Some(Value::Null) => {
                    return Err(ToolError::invalid_params(format!("{} is required", name)));
                }
                _ => {},
            }
        }

        for (name, value) in params {
            let Some(schema) = self.properties.get(name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if !schema.param_type.accepts(value) {
                return Err(ToolError::invalid_params(format!(
                    "{} must be a {}",
                    name,
                    schema.param_type.as_str()
                )));
            }
            if let (Some(allowed), Some(text)) = (&schema.enum_values, value.as_str()) {
                if !allowed.iter().any(|a| a == text) {
                    return Err(ToolError::invalid_params(format!(
                        "{} must be one of: {}",
                        name,
                        allowed.join(", ")
                    )));
                }
            }
        }

        Ok(())
    }

    /// JSON-schema rendering handed to the remote agent
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Full tool description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: InputSchema,
}

/// Agent-invokable local operation
///
/// Handlers may run concurrently with themselves; implementations that need
/// serialization must do it internally.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    /// Run the operation and describe the outcome in plain text
    async fn execute(&self, params: ToolParameters) -> Result<String, ToolError>;

    /// Per-tool timeout; the registry default applies when `None`
    fn timeout_secs(&self) -> Option<u64> {
        None
    }

    fn validate(&self, params: &ToolParameters) -> Result<(), ToolError> {
        self.schema().parameters.validate(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> InputSchema {
        InputSchema::object()
            .property("query", PropertySchema::string("Item to look for"), true)
            .property("limit", PropertySchema::integer("Max results"), false)
            .property(
                "screen",
                PropertySchema::enumeration("Target screen", &["pantry", "cart"]),
                false,
            )
    }

    fn params(value: Value) -> ToolParameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_missing_required_field() {
        let err = schema().validate(&params(json!({"limit": 3}))).unwrap_err();
        assert_eq!(err, ToolError::invalid_params("query is required"));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = schema()
            .validate(&params(json!({"query": "milk", "limit": "three"})))
            .unwrap_err();
        assert!(err.to_string().contains("limit must be a integer"));
    }

    #[test]
    fn test_integral_floats_count_as_integers() {
        assert!(schema()
            .validate(&params(json!({"query": "milk", "limit": 2.0})))
            .is_ok());
        assert!(schema()
            .validate(&params(json!({"query": "milk", "limit": u64::MAX})))
            .is_ok());
        let err = schema()
            .validate(&params(json!({"query": "milk", "limit": 2.5})))
            .unwrap_err();
        assert!(err.to_string().contains("limit must be a integer"));
    }

    #[test]
    fn test_enum_membership() {
        assert!(schema()
            .validate(&params(json!({"query": "x", "screen": "cart"})))
            .is_ok());
        assert!(schema()
            .validate(&params(json!({"query": "x", "screen": "garage"})))
            .is_err());
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        assert!(schema()
            .validate(&params(json!({"query": "eggs", "mood": "hungry"})))
            .is_ok());
    }

    #[test]
    fn test_json_schema_rendering() {
        let rendered = schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["query"]["type"], "string");
        assert_eq!(rendered["required"][0], "query");
        assert_eq!(rendered["properties"]["screen"]["enum"][1], "cart");
    }
}
