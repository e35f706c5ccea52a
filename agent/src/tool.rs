//! The tool abstraction and its uniform result envelope.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};

/// Result envelope returned by every tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the call succeeded.
    pub success: bool,

    /// Tool-specific payload; `null` on failure.
    pub data: Value,

    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Call details such as tool name and duration.
    pub metadata: Map<String, Value>,
}

impl ToolOutput {
    /// Create a successful output.
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            metadata: Map::new(),
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
            metadata: Map::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl From<Result<Value>> for ToolOutput {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// A named capability the agent can invoke with JSON arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used for dispatch.
    fn name(&self) -> &str;

    /// One-line description.
    fn description(&self) -> &str;

    /// Run the tool. Errors are folded into a failed [`ToolOutput`] by the
    /// registry.
    async fn call(&self, args: Value) -> Result<Value>;

    /// Run the tool and wrap the outcome.
    async fn execute(&self, args: Value) -> ToolOutput {
        self.call(args).await.into()
    }
}

/// Deserialize tool arguments, mapping failures to `InvalidArguments`.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| AgentError::InvalidArguments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Args {
        path: String,
    }

    #[test]
    fn test_parse_args() {
        let args: Args = parse_args(json!({"path": "a.md"})).unwrap();
        assert_eq!(args.path, "a.md");

        let err = parse_args::<Args>(json!({"file": "a.md"})).unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));
    }

    #[test]
    fn test_output_serialization() {
        let output = ToolOutput::failure("boom").with_metadata("tool", "read_file");
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "success": false,
                "data": null,
                "error": "boom",
                "metadata": {"tool": "read_file"}
            })
        );

        let output = ToolOutput::from(Ok::<_, AgentError>(json!({"n": 1})));
        assert!(output.success);
        assert!(output.error.is_none());
    }
}
