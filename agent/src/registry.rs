//! Runtime registry of callable tools.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::tool::{Tool, ToolOutput};

/// Name and description of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Maps tool names to implementations.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool`, replacing any tool with the same name.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.write().await.insert(name.clone(), tool).is_some() {
            warn!("Tool {name} was already registered; replacing it");
        } else {
            debug!("Registered tool: {name}");
        }
    }

    /// Remove a tool; returns whether it was registered.
    pub async fn unregister(&self, name: &str) -> bool {
        self.tools.write().await.remove(name).is_some()
    }

    /// Get a tool by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    /// All registered tools, sorted by name.
    pub async fn list(&self) -> Vec<ToolInfo> {
        let tools = self.tools.read().await;
        let mut infos: Vec<ToolInfo> = tools
            .values()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Run the named tool. Unknown names and tool errors come back as a
    /// failed output; `metadata` carries `tool` and `durationMs`.
    pub async fn execute(&self, name: &str, args: Value) -> ToolOutput {
        let start = Instant::now();
        let output = match self.get(name).await {
            Some(tool) => {
                debug!("Executing tool: {name}");
                tool.execute(args).await
            }
            None => ToolOutput::failure(AgentError::UnknownTool(name.to_string()).to_string()),
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        if let Some(error) = &output.error {
            warn!("Tool {name} failed in {duration_ms}ms: {error}");
        } else {
            info!("Tool {name} completed in {duration_ms}ms");
        }

        output
            .with_metadata("tool", name)
            .with_metadata("durationMs", duration_ms)
    }
}
