//! Think tool: scratchpad reasoning that doubles as the planning step.
//!
//! When the scratchpad names a discovered broker tool with all of its
//! required parameters, the plan extractor commits an execution plan for
//! this thread, which is what later authorizes `execute_tool`.

use crate::context::RunContext;
use crate::tools::registry::Tool;
use crate::tools::types::{PropertySchema, ToolContext, ToolGroup, ToolInputSchema, ToolResult, ToolSpec};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct ThinkTool {
    definition: ToolSpec,
    run: Arc<RunContext>,
}

impl ThinkTool {
    pub fn new(run: Arc<RunContext>) -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "scratchpad".to_string(),
            PropertySchema::new(
                "string",
                "Your reasoning. Before execute_tool, name the tool (e.g. GITHUB_LIST_PULL_REQUESTS) and every required parameter with its value, e.g. owner='acme', repo='api'.",
            ),
        );
        properties.insert(
            "last_tool_call".to_string(),
            PropertySchema::new(
                "string",
                "What was just called and what it returned, e.g. 'Tool: search_tools, Result: found 3 tools'.",
            ),
        );

        ThinkTool {
            definition: ToolSpec {
                name: "think".to_string(),
                description: "Think about the current situation. You MUST call this before every execute_tool call to plan it, and after each action to reflect on the result.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["scratchpad".to_string()],
                },
                group: ToolGroup::Reasoning,
            },
            run,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ThinkParams {
    scratchpad: String,
    #[serde(default)]
    last_tool_call: Option<String>,
}

#[async_trait]
impl Tool for ThinkTool {
    fn definition(&self) -> ToolSpec {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: ThinkParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };

        let mut output = format!("Thought: {}", params.scratchpad);
        if let Some(last) = params.last_tool_call.as_deref().filter(|s| !s.trim().is_empty()) {
            output.push_str(&format!("\nLast tool: {}", last));
        }

        match self.run.extractor.plan(&context.thread_id, &params.scratchpad).await {
            Some(plan) => {
                output.push_str(&format!(
                    "\nExecution plan recorded for {} ({} params). You may now call execute_tool.",
                    plan.tool_name,
                    plan.params.len()
                ));
                ToolResult::success(output).with_metadata(json!({
                    "planned_tool": plan.tool_name,
                    "params": plan.params,
                }))
            }
            None => ToolResult::success(output),
        }
    }
}
