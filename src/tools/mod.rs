//! Tools the chat model may call.
//!
//! Each tool advertises a JSON-schema parameter object; the orchestrator
//! hands model-issued calls to [`ToolRegistry::dispatch`].

pub mod get_weather;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub use get_weather::WeatherTool;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the argument object.
    fn parameters(&self) -> Value;

    /// Run the tool. Failures are reported in the returned text so the model
    /// can relay them.
    async fn call(&self, arguments: Value) -> String;
}

/// Function-tool declaration in the shape chat APIs expect.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        tracing::debug!(tool = tool.name(), "tool registered");
        self.tools.push(tool);
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                kind: "function",
                function: FunctionDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters(),
                },
            })
            .collect()
    }

    /// Run the named tool, or return `None` if no tool has that name.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Option<String> {
        let tool = self.tools.iter().find(|t| t.name() == name)?;
        tracing::info!(tool = name, %arguments, "tool call");
        Some(tool.call(arguments).await)
    }
}
