use std::time::Instant;

use async_trait::async_trait;

use crate::tools::tool::{Tool, ToolError, ToolOutput, require_str};

/// Echoes its `message` parameter back.
#[derive(Debug, Default)]
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the input message. Useful for testing."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back"
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let message = require_str(&params, "message")?;
        Ok(ToolOutput::text(message, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo() {
        let out = EchoTool
            .execute(serde_json::json!({"message": "hello"}))
            .await
            .unwrap();
        assert_eq!(out.result, serde_json::json!("hello"));
        assert!(out.is_ok());
    }

    #[tokio::test]
    async fn test_echo_missing_message() {
        let err = EchoTool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
