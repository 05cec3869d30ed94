use crate::tools::types::{ToolContext, ToolGroup, ToolResult, ToolSpec};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition for the AI API
    fn definition(&self) -> ToolSpec;

    /// Executes the tool with the given parameters
    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult;

    /// Returns the tool's group for access control
    fn group(&self) -> ToolGroup {
        self.definition().group
    }
}

/// Registry that holds the tools one agent may call.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool (thread-safe, takes &self via interior mutability)
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name.clone();
        self.tools.write().insert(name, tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// Get tools that belong to one of `groups`
    pub fn get_tools_for_groups(&self, groups: &[ToolGroup]) -> Vec<Arc<dyn Tool>> {
        self.tools
            .read()
            .values()
            .filter(|tool| groups.contains(&tool.group()))
            .cloned()
            .collect()
    }

    /// Tool definitions for the given groups, sorted by name so prompts are stable
    pub fn get_tool_definitions_for_groups(&self, groups: &[ToolGroup]) -> Vec<ToolSpec> {
        let mut definitions: Vec<ToolSpec> = self
            .get_tools_for_groups(groups)
            .iter()
            .map(|tool| tool.definition())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool by name, refusing tools outside `groups`
    pub async fn execute(
        &self,
        name: &str,
        params: Value,
        context: &ToolContext,
        groups: &[ToolGroup],
    ) -> ToolResult {
        let tool = match self.get(name) {
            Some(t) => t,
            None => return ToolResult::error(format!("Tool '{}' not found", name)),
        };

        if !groups.contains(&tool.group()) {
            return ToolResult::error(format!("Tool '{}' is not allowed", name));
        }

        tool.execute(params, context).await
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.read().contains_key(name)
    }

    /// Get count of registered tools
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
