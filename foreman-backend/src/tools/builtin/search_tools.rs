//! Search tool: semantic discovery of broker tools.
//!
//! Every tool it returns lands in the schema cache, which is what makes the
//! tool plannable by `think`.

use crate::context::RunContext;
use crate::tools::registry::Tool;
use crate::tools::types::{PropertySchema, ToolContext, ToolGroup, ToolInputSchema, ToolResult, ToolSpec};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct SearchToolsTool {
    definition: ToolSpec,
    run: Arc<RunContext>,
}

impl SearchToolsTool {
    pub fn new(run: Arc<RunContext>) -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "query".to_string(),
            PropertySchema::new(
                "string",
                "The capability you need, e.g. 'list pull requests in a repository'. Describe the action, not literal data values.",
            ),
        );
        properties.insert(
            "reasoning".to_string(),
            PropertySchema::new("string", "Why you need this capability"),
        );
        properties.insert(
            "integration_filter".to_string(),
            PropertySchema::string_array(
                "Restrict the search to these integrations, e.g. [\"github\"]",
                "Lowercase integration name",
            ),
        );

        SearchToolsTool {
            definition: ToolSpec {
                name: "search_tools".to_string(),
                description: "Find integration tools for a capability. Returns tool names, descriptions and parameter schemas. An empty result means you should try a different query.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["query".to_string()],
                },
                group: ToolGroup::Discovery,
            },
            run,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchToolsParams {
    query: String,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    integration_filter: Option<Vec<String>>,
}

#[async_trait]
impl Tool for SearchToolsTool {
    fn definition(&self) -> ToolSpec {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: SearchToolsParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };
        if params.query.trim().is_empty() {
            return ToolResult::error("query must not be empty");
        }
        if let Some(reasoning) = params.reasoning.as_deref() {
            log::debug!("[DISCOVERY] Search reasoning: {}", reasoning);
        }

        // An explicit filter wins; otherwise use the agent's own restriction
        let domains = match params.integration_filter {
            Some(filter) if !filter.is_empty() => filter,
            _ => context.integrations.clone(),
        };
        let domains = if domains.is_empty() { None } else { Some(domains.as_slice()) };

        let user_id = self.run.user_context.user_id(&context.thread_id);
        let tools = self
            .run
            .discovery
            .discover(&params.query, domains, self.run.search_top_k, &user_id)
            .await;

        if tools.is_empty() {
            return ToolResult::success(format!(
                "No tools found for '{}'. Try a different capability query.",
                params.query
            ))
            .with_metadata(json!({"tool_names": []}));
        }

        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        let metadata = json!({ "tool_names": names });
        match serde_json::to_string_pretty(&tools) {
            Ok(body) => ToolResult::success(body).with_metadata(metadata),
            Err(e) => ToolResult::error(format!("Failed to serialize tools: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockAiClient;
    use crate::integrations::SearchHit;
    use crate::testing::{FakeBroker, FakeSearch};

    fn hit(name: &str) -> SearchHit {
        SearchHit {
            name: name.to_string(),
            description: "desc".to_string(),
            score: 0.5,
            parameters: None,
        }
    }

    fn tool_with(search: Arc<FakeSearch>) -> (SearchToolsTool, Arc<RunContext>) {
        let run = RunContext::builder(Arc::new(MockAiClient::default()), search, Arc::new(FakeBroker::default()))
            .build();
        (SearchToolsTool::new(run.clone()), run)
    }

    #[tokio::test]
    async fn test_results_are_cached_and_listed() {
        let search = Arc::new(FakeSearch::new(vec![hit("GITHUB_GET_REPO")]));
        let (tool, run) = tool_with(search);

        let result = tool
            .execute(json!({"query": "get repository details"}), &ToolContext::new("t1"))
            .await;

        assert!(result.success);
        assert!(result.content.contains("GITHUB_GET_REPO"));
        assert!(run.schema_cache.contains("GITHUB_GET_REPO"));
    }

    #[tokio::test]
    async fn test_worker_integrations_used_as_default_filter() {
        let search = Arc::new(FakeSearch::new(vec![hit("GITHUB_GET_REPO"), hit("ASANA_GET_TASK")]));
        let (tool, _) = tool_with(search.clone());
        let context = ToolContext::new("t1").with_integrations(vec!["asana".to_string()]);

        let result = tool.execute(json!({"query": "get"}), &context).await;

        assert!(result.content.contains("ASANA_GET_TASK"));
        assert!(!result.content.contains("GITHUB_GET_REPO"));
        assert_eq!(search.queries.lock()[0].1.as_deref(), Some("asana"));
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let (tool, _) = tool_with(Arc::new(FakeSearch::failing()));
        let result = tool.execute(json!({"query": "anything"}), &ToolContext::new("t1")).await;
        assert!(result.success);
        assert!(result.content.starts_with("No tools found"));
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let (tool, _) = tool_with(Arc::new(FakeSearch::new(vec![])));
        let result = tool.execute(json!({"query": "  "}), &ToolContext::new("t1")).await;
        assert!(!result.success);
    }
}
