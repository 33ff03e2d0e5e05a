//! Tool trait and types.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The result data.
    pub result: serde_json::Value,
    /// Time taken.
    pub duration: Duration,
}

impl ToolOutput {
    /// Create a successful output with a JSON result.
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }

    /// Create a text output.
    pub fn text(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            result: serde_json::Value::String(text.into()),
            duration,
        }
    }

    /// Whether the result follows the soft-failure convention (see [`is_ok_result`]).
    pub fn is_ok(&self) -> bool {
        is_ok_result(&self.result)
    }
}

/// Name, description and parameter schema of a tool, as shown to the model
/// and to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Trait for tools that the agent can use.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get a description of what the tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    ///
    /// `params` is always a JSON object. Tools that want to report a soft
    /// failure without erroring return an object with an `error` or
    /// `error_msg` field instead.
    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError>;

    /// Get the tool schema.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Whether a tool result counts as a success.
///
/// Anything that is not a JSON object is ok. An object is not ok when it
/// carries a truthy `error` field or a non-blank string `error_msg` field.
pub fn is_ok_result(result: &serde_json::Value) -> bool {
    let Some(obj) = result.as_object() else {
        return true;
    };

    if obj.get("error").is_some_and(is_truthy) {
        return false;
    }

    !obj.get("error_msg")
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.trim().is_empty())
}

fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Extract a required string parameter from a JSON object.
///
/// Returns `ToolError::InvalidParameters` if the key is missing or not a string.
pub fn require_str<'a>(params: &'a serde_json::Value, name: &str) -> Result<&'a str, ToolError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{}' parameter", name)))
}

/// Extract a required parameter of any type from a JSON object.
pub fn require_param<'a>(
    params: &'a serde_json::Value,
    name: &str,
) -> Result<&'a serde_json::Value, ToolError> {
    params
        .get(name)
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{}' parameter", name)))
}

/// Read an optional boolean parameter, falling back to `default`.
pub fn optional_bool(params: &serde_json::Value, name: &str, default: bool) -> bool {
    params
        .get(name)
        .and_then(|v| v.as_bool())
        .unwrap_or(default)
}

/// Read an optional string parameter, falling back to `default`.
pub fn optional_str<'a>(params: &'a serde_json::Value, name: &str, default: &'a str) -> &'a str {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
}

/// Lenient structural check of a tool's `parameters_schema()`.
///
/// Returns a list of problems; an empty list means the schema is usable.
///
/// # Rules enforced
///
/// 1. Top-level must have `"type": "object"`
/// 2. Top-level must have `"properties"` as an object
/// 3. Every key in `"required"` must exist in `"properties"`
/// 4. Nested objects follow the same rules recursively
/// 5. Array properties should have `"items"` defined
///
/// Properties without a `"type"` field are allowed (freeform/any-type).
pub fn validate_tool_schema(schema: &serde_json::Value, path: &str) -> Vec<String> {
    let mut errors = Vec::new();

    match schema.get("type").and_then(|t| t.as_str()) {
        Some("object") => {}
        Some(other) => {
            errors.push(format!("{path}: expected type \"object\", got \"{other}\""));
            return errors;
        }
        None => {
            errors.push(format!("{path}: missing \"type\": \"object\""));
            return errors;
        }
    }

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        errors.push(format!("{path}: missing or non-object \"properties\""));
        return errors;
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|r| r.as_str()) {
            if !properties.contains_key(key) {
                errors.push(format!(
                    "{path}: required key \"{key}\" not found in properties"
                ));
            }
        }
    }

    for (key, prop) in properties {
        let prop_path = format!("{path}.{key}");
        match prop.get("type").and_then(|t| t.as_str()) {
            Some("object") => errors.extend(validate_tool_schema(prop, &prop_path)),
            Some("array") => match prop.get("items") {
                Some(items) if items.get("type").and_then(|t| t.as_str()) == Some("object") => {
                    errors.extend(validate_tool_schema(items, &format!("{prop_path}.items")));
                }
                Some(_) => {}
                None => errors.push(format!("{prop_path}: array property missing \"items\"")),
            },
            _ => {}
        }
    }

    errors
}
