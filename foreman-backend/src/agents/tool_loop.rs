//! Shared model/tool loop used by the supervisor and by workers.

use crate::agents::budget::ToolCallBudget;
use crate::ai::{ChatModel, Message, ToolCall, ToolHistoryEntry, ToolResponse};
use crate::tools::{ToolContext, ToolGroup, ToolRegistry};
use serde_json::Value;

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq)]
pub enum LoopExit {
    /// The model answered without calling tools
    Finished,
    /// A tool-call ceiling refused a call; holds the refusal text
    BudgetExceeded(String),
    /// The model-turn cap was reached while tools were still being called
    TurnLimit,
    /// The model provider failed after its retries
    ModelError(String),
}

/// One executed tool call, in call order
#[derive(Debug, Clone)]
pub struct ToolEvent {
    pub tool_name: String,
    pub arguments: Value,
    pub success: bool,
    pub content: String,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub final_content: String,
    pub tool_calls_made: u32,
    pub events: Vec<ToolEvent>,
    pub history: Vec<ToolHistoryEntry>,
    pub exit: LoopExit,
}

pub struct AgentLoop<'a> {
    pub model: &'a dyn ChatModel,
    pub registry: &'a ToolRegistry,
    pub groups: &'a [ToolGroup],
    pub context: &'a ToolContext,
    pub label: &'a str,
}

/// Some providers hand back arguments as a JSON string
fn call_arguments(call: &ToolCall) -> Value {
    match &call.arguments {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => call.arguments.clone(),
        },
        other => other.clone(),
    }
}

impl AgentLoop<'_> {
    /// Drive the model until it answers without tools, a budget refuses a
    /// call, or `budget.max_model_turns()` is reached. `history` carries
    /// earlier tool rounds and is returned extended.
    pub async fn run(
        &self,
        messages: Vec<Message>,
        mut history: Vec<ToolHistoryEntry>,
        budget: &mut ToolCallBudget,
    ) -> LoopOutcome {
        let tools = self.registry.get_tool_definitions_for_groups(self.groups);
        let mut events = Vec::new();
        let mut tool_calls_made = 0;
        let mut last_content = String::new();
        let max_turns = budget.max_model_turns();

        for turn in 1..=max_turns {
            log::debug!("[{}] Model turn {} on thread {}", self.label, turn, self.context.thread_id);

            let response = match self
                .model
                .generate_with_tools(messages.clone(), history.clone(), tools.clone())
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    log::error!("[{}] Model call failed: {}", self.label, e);
                    return LoopOutcome {
                        final_content: format!("❌ Model error: {}", e),
                        tool_calls_made,
                        events,
                        history,
                        exit: LoopExit::ModelError(e.to_string()),
                    };
                }
            };

            if !response.has_tool_calls() {
                return LoopOutcome {
                    final_content: response.content,
                    tool_calls_made,
                    events,
                    history,
                    exit: LoopExit::Finished,
                };
            }
            if !response.content.trim().is_empty() {
                last_content = response.content.clone();
            }

            let mut responses = Vec::with_capacity(response.tool_calls.len());
            let mut refusal: Option<String> = None;
            for call in &response.tool_calls {
                if let Some(reason) = &refusal {
                    responses.push(ToolResponse::error(call.id.clone(), reason.clone()));
                    continue;
                }
                if let Err(e) = budget.try_consume(&call.name) {
                    log::warn!("[{}] {}", self.label, e);
                    let reason = e.to_string();
                    responses.push(ToolResponse::error(call.id.clone(), reason.clone()));
                    refusal = Some(reason);
                    continue;
                }

                let arguments = call_arguments(call);
                log::info!("[{}] Calling {}", self.label, call.name);
                let result = self
                    .registry
                    .execute(&call.name, arguments.clone(), self.context, self.groups)
                    .await;
                tool_calls_made += 1;

                responses.push(if result.success {
                    ToolResponse::success(call.id.clone(), result.content.clone())
                } else {
                    ToolResponse::error(call.id.clone(), result.content.clone())
                });
                events.push(ToolEvent {
                    tool_name: call.name.clone(),
                    arguments,
                    success: result.success,
                    content: result.content,
                    metadata: result.metadata,
                });
            }
            history.push(ToolHistoryEntry::new(response.tool_calls, responses).with_content(response.content));

            if let Some(reason) = refusal {
                let final_content = if last_content.is_empty() {
                    format!("❌ Stopped: {}", reason)
                } else {
                    format!("{}\n\n❌ Stopped: {}", last_content, reason)
                };
                return LoopOutcome {
                    final_content,
                    tool_calls_made,
                    events,
                    history,
                    exit: LoopExit::BudgetExceeded(reason),
                };
            }
        }

        log::warn!("[{}] Reached {} model turns", self.label, max_turns);
        LoopOutcome {
            final_content: if last_content.is_empty() {
                format!("Stopped after {} model turns without a final answer", max_turns)
            } else {
                last_content
            },
            tool_calls_made,
            events,
            history,
            exit: LoopExit::TurnLimit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::budget::{AgentBudgetConfig, ThreadCallCounters, ToolCallLimit};
    use crate::ai::{AiError, AiResponse, MockAiClient};
    use crate::tools::builtin::WriteTodosTool;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn registry() -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(WriteTodosTool::new()));
        registry
    }

    fn budget(run_limit: u32, turns: u32) -> ToolCallBudget {
        ToolCallBudget::new(
            AgentBudgetConfig {
                total: ToolCallLimit::new(100, run_limit),
                per_tool: BTreeMap::new(),
                max_model_turns: turns,
            },
            "t1",
            Arc::new(ThreadCallCounters::new()),
        )
    }

    fn todo_call(id: &str) -> ToolCall {
        ToolCall::new(id, "write_todos", json!({"todos": ["GitHub: look"]}))
    }

    #[tokio::test]
    async fn test_runs_tools_until_text_answer() {
        let model = MockAiClient::new(vec![
            AiResponse::with_tools("Planning first.", vec![todo_call("c1")]),
            AiResponse::text("all done"),
        ]);
        let registry = registry();
        let context = ToolContext::new("t1");
        let agent = AgentLoop {
            model: &model,
            registry: &registry,
            groups: &[ToolGroup::Planning],
            context: &context,
            label: "TEST",
        };

        let outcome = agent.run(vec![Message::user("go")], vec![], &mut budget(10, 5)).await;
        assert_eq!(outcome.exit, LoopExit::Finished);
        assert_eq!(outcome.final_content, "all done");
        assert_eq!(outcome.tool_calls_made, 1);
        assert_eq!(outcome.events[0].metadata.as_ref().unwrap()["write_todos"], true);
        assert_eq!(outcome.history.len(), 1);

        let second = &model.requests()[1];
        assert_eq!(second.tool_history.len(), 1);
        assert_eq!(second.tool_history[0].assistant_content, "Planning first.");
        assert_eq!(second.tool_names, vec!["write_todos"]);
    }

    #[tokio::test]
    async fn test_budget_refusal_stops_loop() {
        let model = MockAiClient::new(vec![AiResponse::with_tools(
            "working",
            vec![todo_call("c1"), todo_call("c2"), todo_call("c3")],
        )]);
        let registry = registry();
        let context = ToolContext::new("t1");
        let agent = AgentLoop {
            model: &model,
            registry: &registry,
            groups: &[ToolGroup::Planning],
            context: &context,
            label: "TEST",
        };

        let outcome = agent.run(vec![Message::user("go")], vec![], &mut budget(1, 5)).await;
        assert!(matches!(outcome.exit, LoopExit::BudgetExceeded(_)));
        assert_eq!(outcome.tool_calls_made, 1);
        assert!(outcome.final_content.contains("Tool call limit reached"));
        assert_eq!(outcome.history[0].tool_responses.len(), 3);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_group_outside_agent_is_refused_as_tool_error() {
        let model = MockAiClient::new(vec![
            AiResponse::with_tools("", vec![todo_call("c1")]),
            AiResponse::text("ok"),
        ]);
        let registry = registry();
        let context = ToolContext::new("t1");
        let agent = AgentLoop {
            model: &model,
            registry: &registry,
            groups: &[ToolGroup::Reasoning],
            context: &context,
            label: "TEST",
        };

        let outcome = agent.run(vec![Message::user("go")], vec![], &mut budget(10, 5)).await;
        assert!(!outcome.events[0].success);
        assert!(outcome.events[0].content.contains("not allowed"));
    }

    #[tokio::test]
    async fn test_turn_limit_and_model_error() {
        let model = MockAiClient::new(vec![
            AiResponse::with_tools("still going", vec![todo_call("c1")]),
            AiResponse::with_tools("", vec![todo_call("c2")]),
        ]);
        let registry = registry();
        let context = ToolContext::new("t1");
        let agent = AgentLoop {
            model: &model,
            registry: &registry,
            groups: &[ToolGroup::Planning],
            context: &context,
            label: "TEST",
        };
        let outcome = agent.run(vec![Message::user("go")], vec![], &mut budget(10, 2)).await;
        assert_eq!(outcome.exit, LoopExit::TurnLimit);
        assert_eq!(outcome.final_content, "still going");

        model.push_error(AiError::with_status("overloaded", 503));
        let outcome = agent.run(vec![Message::user("go")], vec![], &mut budget(10, 2)).await;
        assert!(matches!(outcome.exit, LoopExit::ModelError(_)));
        assert!(outcome.final_content.starts_with("❌"));
    }

    #[test]
    fn test_string_arguments_parsed() {
        let call = ToolCall::new("c1", "x", Value::String("{\"a\": 1}".to_string()));
        assert_eq!(call_arguments(&call), json!({"a": 1}));
        let call = ToolCall::new("c1", "x", Value::String("not json".to_string()));
        assert_eq!(call_arguments(&call), Value::String("not json".to_string()));
    }
}
