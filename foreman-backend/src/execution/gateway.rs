use crate::catalog::{tool_domain, ToolDefinition, ToolSchemaCache};
use crate::context::UserContextStore;
use crate::errors::ToolError;
use crate::execution::normalize::normalize_nested_json;
use crate::integrations::{IntegrationBroker, ToolInvocation};
use crate::planning::{validate_arguments, PlanStore};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct ExecutionGateway {
    plan_store: Arc<PlanStore>,
    schema_cache: Arc<ToolSchemaCache>,
    broker: Arc<dyn IntegrationBroker>,
    user_context: Arc<UserContextStore>,
}

/// Model-facing tool names sometimes arrive namespaced as `functions.X`
pub fn clean_tool_name(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix("functions.").unwrap_or(name)
}

fn parse_arguments(raw: &str) -> Result<Map<String, Value>, ToolError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments {
        message: e.to_string(),
    })?;
    match normalize_nested_json(value) {
        Value::Object(map) => Ok(map),
        other => Err(ToolError::InvalidArguments {
            message: format!("expected a JSON object, got {}", other),
        }),
    }
}

impl ExecutionGateway {
    pub fn new(
        plan_store: Arc<PlanStore>,
        schema_cache: Arc<ToolSchemaCache>,
        broker: Arc<dyn IntegrationBroker>,
        user_context: Arc<UserContextStore>,
    ) -> Self {
        ExecutionGateway {
            plan_store,
            schema_cache,
            broker,
            user_context,
        }
    }

    /// Cached schema, or one fetched from the broker (and then cached)
    async fn resolve_schema(&self, tool_name: &str, user_id: &str) -> Option<Arc<ToolDefinition>> {
        if let Some(schema) = self.schema_cache.get(tool_name) {
            return Some(schema);
        }
        match self.broker.get_schemas(user_id, &[tool_name.to_string()]).await {
            Ok(defs) => {
                let def = defs.into_iter().find(|d| d.name == tool_name)?;
                self.schema_cache.insert(def);
                self.schema_cache.get(tool_name)
            }
            Err(e) => {
                log::warn!("[EXECUTE] Schema fetch for {} failed: {}", tool_name, e);
                None
            }
        }
    }

    /// Run one broker tool for `thread_id`. On success returns the broker
    /// result stringified; every failure is a typed [`ToolError`].
    pub async fn execute(&self, thread_id: &str, tool_name: &str, raw_args: &str) -> Result<String, ToolError> {
        let tool_name = clean_tool_name(tool_name);
        let arguments = parse_arguments(raw_args)?;

        let plan = self
            .plan_store
            .take(thread_id, tool_name)
            .ok_or_else(|| ToolError::PlanRequired {
                tool_name: tool_name.to_string(),
            })?;

        let user_id = self.user_context.user_id(thread_id);
        let schema = self
            .resolve_schema(tool_name, &user_id)
            .await
            .ok_or_else(|| ToolError::SchemaUnavailable {
                tool_name: tool_name.to_string(),
            })?;

        let report = validate_arguments(&schema.parameters, &arguments);
        if !report.is_valid() {
            log::info!(
                "[EXECUTE] Validation failed for {}: {}",
                tool_name,
                report.to_message().replace('\n', "; ")
            );
            return Err(ToolError::ValidationError {
                tool_name: tool_name.to_string(),
                details: format!("{}\n\nExpected parameters:\n{}", report.to_message(), schema.schema_summary()),
                planned_reasoning: Some(plan.reasoning).filter(|r| !r.is_empty()),
            });
        }

        let identity = self
            .user_context
            .identity_for(thread_id, tool_domain(tool_name).as_deref());
        log::info!(
            "[EXECUTE] {} on thread {} (user {}, account {:?})",
            tool_name,
            thread_id,
            identity.user_id,
            identity.connected_account_id
        );

        let result = self
            .broker
            .invoke(ToolInvocation {
                tool_name: tool_name.to_string(),
                user_id: identity.user_id,
                connected_account_id: identity.connected_account_id,
                arguments: Value::Object(arguments),
            })
            .await
            .map_err(|message| ToolError::ExecutionError {
                tool_name: tool_name.to_string(),
                message,
            })?;

        Ok(match result {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ParamType, ToolParameter};
    use crate::context::{RequestContext, UserContext};
    use crate::planning::ExecutionPlan;
    use crate::testing::FakeBroker;
    use serde_json::json;

    const TOOL: &str = "GITHUB_LIST_PULL_REQUESTS";

    fn schema() -> ToolDefinition {
        ToolDefinition::new(
            TOOL,
            "List PRs",
            vec![
                ToolParameter::new("owner", ParamType::String, true),
                ToolParameter::new("repo", ParamType::String, true),
            ],
        )
    }

    struct Fixture {
        gateway: ExecutionGateway,
        plans: Arc<PlanStore>,
        cache: Arc<ToolSchemaCache>,
        broker: Arc<FakeBroker>,
        users: Arc<UserContextStore>,
    }

    fn fixture(broker: FakeBroker) -> Fixture {
        let plans = Arc::new(PlanStore::default());
        let cache = Arc::new(ToolSchemaCache::default());
        let broker = Arc::new(broker);
        let users = Arc::new(UserContextStore::new("env-user"));
        Fixture {
            gateway: ExecutionGateway::new(plans.clone(), cache.clone(), broker.clone(), users.clone()),
            plans,
            cache,
            broker,
            users,
        }
    }

    fn plan() -> ExecutionPlan {
        ExecutionPlan::new(TOOL, "list open PRs", Map::new())
    }

    #[tokio::test]
    async fn test_without_plan_broker_never_invoked() {
        let f = fixture(FakeBroker::default());
        f.cache.insert(schema());
        let err = f
            .gateway
            .execute("t1", TOOL, r#"{"owner": "a", "repo": "b"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "plan_required");
        assert_eq!(f.broker.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_plan_consumed_by_success() {
        let f = fixture(FakeBroker::default().with_result(TOOL, Ok(json!({"prs": [1]}))));
        f.cache.insert(schema());
        f.plans.upsert("t1", plan());

        let out = f
            .gateway
            .execute("t1", &format!("functions.{}", TOOL), r#"{"owner": "a", "repo": "b"}"#)
            .await
            .unwrap();
        assert_eq!(out, r#"{"prs":[1]}"#);

        let second = f.gateway.execute("t1", TOOL, r#"{"owner": "a", "repo": "b"}"#).await;
        assert_eq!(second.unwrap_err().kind(), "plan_required");
        assert_eq!(f.broker.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_still_consumes_plan() {
        let f = fixture(FakeBroker::default());
        f.cache.insert(schema());
        f.plans.upsert("t1", plan());

        let err = f
            .gateway
            .execute("t1", TOOL, r#"{"owner": "a", "repo": "  "}"#)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        let text = err.to_string();
        assert!(text.contains("Empty required params: repo"));
        assert!(text.contains("list open PRs"));
        assert!(f.plans.peek("t1", TOOL).is_none());
        assert_eq!(f.broker.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_json_rejected_before_plan_gate() {
        let f = fixture(FakeBroker::default());
        f.plans.upsert("t1", plan());

        let err = f.gateway.execute("t1", TOOL, "{owner: a").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
        assert!(err.to_string().starts_with("Error: params must be valid JSON string."));
        assert!(f.plans.peek("t1", TOOL).is_some());

        let err = f.gateway.execute("t1", TOOL, "[1, 2]").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
    }

    #[tokio::test]
    async fn test_schema_fetched_from_broker_when_not_cached() {
        let f = fixture(FakeBroker::default().with_schema(schema()));
        f.plans.upsert("t1", plan());

        f.gateway
            .execute("t1", TOOL, r#"{"owner": "a", "repo": "b"}"#)
            .await
            .unwrap();
        assert!(f.cache.contains(TOOL));
        assert_eq!(f.broker.schema_requests(), 1);
    }

    #[tokio::test]
    async fn test_schema_unavailable() {
        let f = fixture(FakeBroker::default());
        f.plans.upsert("t1", plan());
        let err = f.gateway.execute("t1", TOOL, "{}").await.unwrap_err();
        assert_eq!(err.kind(), "schema_unavailable");
        assert_eq!(f.broker.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_broker_error_becomes_execution_error() {
        let f = fixture(FakeBroker::default().with_result(TOOL, Err("Not Found".to_string())));
        f.cache.insert(schema());
        f.plans.upsert("t1", plan());

        let err = f
            .gateway
            .execute("t1", TOOL, r#"{"owner": "a", "repo": "b"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("Error executing {}: Not Found", TOOL));
    }

    #[tokio::test]
    async fn test_nested_json_arguments_normalized_and_identity_attached() {
        let f = fixture(FakeBroker::default());
        f.cache.insert(ToolDefinition::new(
            "GITHUB_CREATE_ISSUE",
            "Create issue",
            vec![ToolParameter::new("labels", ParamType::Array, true)],
        ));
        f.plans.upsert("t1", ExecutionPlan::new("GITHUB_CREATE_ISSUE", "", Map::new()));
        let request = RequestContext {
            user_id: Some("user-7".to_string()),
            integrations: json!({"github": {"id": "ca_gh"}}).as_object().unwrap().clone(),
            ..Default::default()
        };
        f.users.store("t1", UserContext::from_request(&request));

        f.gateway
            .execute("t1", "GITHUB_CREATE_ISSUE", r#"{"labels": "[\"bug\"]"}"#)
            .await
            .unwrap();

        let invocations = f.broker.invocations.lock();
        assert_eq!(invocations[0].arguments, json!({"labels": ["bug"]}));
        assert_eq!(invocations[0].user_id, "user-7");
        assert_eq!(invocations[0].connected_account_id.as_deref(), Some("ca_gh"));
    }

    #[test]
    fn test_clean_tool_name() {
        assert_eq!(clean_tool_name("functions.SLACK_POST"), "SLACK_POST");
        assert_eq!(clean_tool_name(" SLACK_POST "), "SLACK_POST");
    }
}
