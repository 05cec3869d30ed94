//! Execute tool: the agent-facing entry to the execution gateway.

use crate::context::RunContext;
use crate::tools::registry::Tool;
use crate::tools::types::{PropertySchema, ToolContext, ToolGroup, ToolInputSchema, ToolResult, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct ExecuteToolTool {
    definition: ToolSpec,
    run: Arc<RunContext>,
}

impl ExecuteToolTool {
    pub fn new(run: Arc<RunContext>) -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "tool_name".to_string(),
            PropertySchema::new("string", "Exact tool name returned by search_tools, e.g. GITHUB_GET_REPO"),
        );
        properties.insert(
            "params".to_string(),
            PropertySchema::new(
                "string",
                "Tool arguments as a JSON object string, e.g. {\"owner\": \"acme\", \"repo\": \"api\"}",
            ),
        );

        ExecuteToolTool {
            definition: ToolSpec {
                name: "execute_tool".to_string(),
                description: "Run an integration tool. Requires a plan recorded by think() for the same tool first; each plan authorizes one call.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["tool_name".to_string(), "params".to_string()],
                },
                group: ToolGroup::Execution,
            },
            run,
        }
    }
}

/// `params` is documented as a JSON string but models often send an object
fn raw_arguments(params: &Value) -> String {
    match params.get("params") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "{}".to_string(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl Tool for ExecuteToolTool {
    fn definition(&self) -> ToolSpec {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let tool_name = match params.get("tool_name").and_then(|v| v.as_str()) {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => return ToolResult::error("Missing 'tool_name' parameter"),
        };
        let raw_args = raw_arguments(&params);

        match self
            .run
            .gateway
            .execute(&context.thread_id, &tool_name, &raw_args)
            .await
        {
            Ok(output) => ToolResult::success(output),
            Err(e) => {
                log::info!("[EXECUTE] {} refused: {}", tool_name, e.kind());
                ToolResult::error(e.to_string()).with_metadata(json!({
                    "error_kind": e.kind(),
                    "tool_name": tool_name,
                }))
            }
        }
    }
}
