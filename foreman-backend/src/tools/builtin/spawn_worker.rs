//! Spawn worker tool - delegates one todo to an ephemeral worker
//!
//! The content is the worker's JSON response; the metadata lets the
//! supervisor loop reconcile its todo list.

use crate::agents::worker::{WorkerRunner, WorkerTask};
use crate::tools::registry::Tool;
use crate::tools::types::{PropertySchema, ToolContext, ToolGroup, ToolInputSchema, ToolResult, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct SpawnWorkerTool {
    definition: ToolSpec,
    runner: Arc<WorkerRunner>,
}

impl SpawnWorkerTool {
    pub fn new(runner: Arc<WorkerRunner>) -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "task_instruction".to_string(),
            PropertySchema::new(
                "string",
                "Concise instruction for the worker, e.g. 'Fetch the most recent merged PR from acme/api and extract its details'",
            ),
        );
        properties.insert(
            "reasoning".to_string(),
            PropertySchema::new("string", "Which service/domain this worker handles and why it is needed"),
        );
        properties.insert(
            "integrations".to_string(),
            PropertySchema::string_array(
                "Integrations the worker may search, e.g. [\"github\"]. Omit to search all.",
                "Lowercase integration name",
            ),
        );
        properties.insert(
            "todo_id".to_string(),
            PropertySchema::new("string", "Id of the todo this worker completes, e.g. todo-1"),
        );
        properties.insert(
            "artifact_keys".to_string(),
            PropertySchema::string_array(
                "Memory keys whose contents the worker needs",
                "Key returned by write_memory",
            ),
        );

        SpawnWorkerTool {
            definition: ToolSpec {
                name: "spawn_worker".to_string(),
                description: "Delegate one todo to a worker that can search for and execute integration tools. Returns the worker's status and summary.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["task_instruction".to_string(), "reasoning".to_string()],
                },
                group: ToolGroup::Delegation,
            },
            runner,
        }
    }
}

#[async_trait]
impl Tool for SpawnWorkerTool {
    fn definition(&self) -> ToolSpec {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let mut task: WorkerTask = match serde_json::from_value(rename_instruction(params)) {
            Ok(t) => t,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };
        task.instruction = task.instruction.trim().to_string();
        if task.instruction.is_empty() {
            return ToolResult::error("task_instruction must not be empty");
        }
        let todo_id = task.todo_id.clone().filter(|id| !id.trim().is_empty());
        task.todo_id = todo_id.clone();

        let response = self.runner.run(&context.thread_id, task).await;
        let metadata = json!({
            "spawn_worker": true,
            "todo_id": todo_id,
            "status": response.status,
        });

        match serde_json::to_string(&response) {
            Ok(body) => ToolResult::success(body).with_metadata(metadata),
            Err(e) => ToolResult::error(format!("Failed to serialize worker response: {}", e)).with_metadata(metadata),
        }
    }
}

/// The tool parameter is `task_instruction`; the task field is `instruction`
fn rename_instruction(mut params: Value) -> Value {
    if let Some(obj) = params.as_object_mut() {
        if let Some(instruction) = obj.remove("task_instruction") {
            obj.insert("instruction".to_string(), instruction);
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiResponse, MockAiClient};
    use crate::context::RunContext;
    use crate::testing::{FakeBroker, FakeSearch};

    fn tool(responses: Vec<AiResponse>) -> SpawnWorkerTool {
        let run = RunContext::builder(
            Arc::new(MockAiClient::new(responses)),
            Arc::new(FakeSearch::new(vec![])),
            Arc::new(FakeBroker::default()),
        )
        .build();
        SpawnWorkerTool::new(Arc::new(WorkerRunner::new(run)))
    }

    #[tokio::test]
    async fn test_worker_result_and_metadata() {
        let tool = tool(vec![AiResponse::text("✅ Task completed")]);
        let result = tool
            .execute(
                json!({"task_instruction": "Close the Asana task", "reasoning": "Asana domain", "todo_id": "todo-2"}),
                &ToolContext::new("root"),
            )
            .await;

        assert!(result.success);
        let body: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(body["status"], "success");
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata["spawn_worker"], true);
        assert_eq!(metadata["todo_id"], "todo-2");
        assert_eq!(metadata["status"], "success");
    }

    #[tokio::test]
    async fn test_worker_model_failure_still_reports() {
        let tool = tool(vec![]);
        let result = tool
            .execute(json!({"task_instruction": "Anything", "reasoning": "x"}), &ToolContext::new("root"))
            .await;

        assert!(result.success);
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata["status"], "failure");
        assert!(metadata["todo_id"].is_null());
    }

    #[tokio::test]
    async fn test_missing_instruction() {
        let tool = tool(vec![]);
        let result = tool.execute(json!({"reasoning": "x"}), &ToolContext::new("root")).await;
        assert!(!result.success);
    }
}
