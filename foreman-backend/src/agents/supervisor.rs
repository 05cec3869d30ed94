//! Supervisor agent: plans todos, delegates them, and loops until none remain.

use crate::agents::budget::ToolCallBudget;
use crate::agents::prompts;
use crate::agents::todos::{TodoEvent, TodoItem, TodoList};
use crate::agents::tool_loop::{AgentLoop, LoopExit, ToolEvent};
use crate::agents::worker::WorkerRunner;
use crate::agents::AgentKind;
use crate::ai::{Message, ToolHistoryEntry};
use crate::context::{RequestContext, RunContext, UserContext};
use crate::tools::{create_supervisor_registry, ToolContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const ROOT_THREAD: &str = "default";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupervisorRequest {
    pub input: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub context: Option<RequestContext>,
}

impl SupervisorRequest {
    pub fn new(input: impl Into<String>) -> Self {
        SupervisorRequest {
            input: input.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupervisorOutcome {
    pub output: String,
    pub todos: Vec<TodoItem>,
    pub thread_id: String,
    pub iterations: u32,
}

/// Todo-list changes carried in tool metadata, in call order
fn todo_events(events: &[ToolEvent]) -> Vec<TodoEvent> {
    events
        .iter()
        .filter_map(|event| {
            let metadata = event.metadata.as_ref()?;
            if metadata.get("write_todos").and_then(|v| v.as_bool()) == Some(true) {
                let todos: Vec<TodoItem> = serde_json::from_value(metadata.get("todos")?.clone()).ok()?;
                return Some(TodoEvent::Replaced(todos));
            }
            if metadata.get("spawn_worker").and_then(|v| v.as_bool()) == Some(true) {
                let todo_id = metadata
                    .get("todo_id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                return Some(TodoEvent::WorkerFinished { todo_id });
            }
            None
        })
        .collect()
}

pub struct Supervisor {
    run: Arc<RunContext>,
}

impl Supervisor {
    pub fn new(run: Arc<RunContext>) -> Self {
        Supervisor { run }
    }

    pub fn run_context(&self) -> &Arc<RunContext> {
        &self.run
    }

    /// Handle one user request. Ends when a reconciliation leaves the todo
    /// list empty or the iteration cap is reached.
    pub async fn run(&self, request: SupervisorRequest) -> Result<SupervisorOutcome, String> {
        let input = request.input.trim().to_string();
        if input.is_empty() {
            return Err("input must not be empty".to_string());
        }
        let thread_id = request
            .thread_id
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| ROOT_THREAD.to_string());

        if let Some(context) = &request.context {
            self.run
                .user_context
                .store(&thread_id, UserContext::from_request(context));
        }

        let result = self.iterate(&thread_id, &input).await;

        self.run.user_context.clear(&thread_id);
        self.run.plan_store.clear_thread(&thread_id);
        self.run.thread_counters.clear_thread(&thread_id);
        result
    }

    async fn iterate(&self, thread_id: &str, input: &str) -> Result<SupervisorOutcome, String> {
        let runner = Arc::new(WorkerRunner::new(self.run.clone()));
        let registry = create_supervisor_registry(&self.run, runner);
        let context = ToolContext::new(thread_id);
        let max_iterations = self.run.limits.max_supervisor_iterations.max(1);

        let mut todos = TodoList::default();
        let mut history: Vec<ToolHistoryEntry> = Vec::new();
        let mut note: Option<String> = None;
        let mut output = String::new();
        let mut iterations = 0;

        while iterations < max_iterations {
            iterations += 1;
            log::info!(
                "[SUPERVISOR] Iteration {} on thread {} ({} todos)",
                iterations,
                thread_id,
                todos.len()
            );

            let messages = vec![
                Message::system(prompts::supervisor_prompt(
                    &self.run.known_domains,
                    &todos.render(),
                    note.as_deref(),
                )),
                Message::user(input),
            ];
            let mut budget = ToolCallBudget::new(
                self.run.limits.supervisor.clone(),
                thread_id,
                self.run.thread_counters.clone(),
            );
            let agent = AgentLoop {
                model: self.run.model.as_ref(),
                registry: &registry,
                groups: AgentKind::Supervisor.allowed_groups(),
                context: &context,
                label: "SUPERVISOR",
            };
            let outcome = agent.run(messages, history, &mut budget).await;
            history = outcome.history;

            if let LoopExit::ModelError(e) = &outcome.exit {
                return Err(format!("Model error: {}", e));
            }

            let removed = todos.apply_events(&todo_events(&outcome.events));
            if removed > 0 {
                log::info!("[SUPERVISOR] Reconciled {} todo(s), {} remaining", removed, todos.len());
            }
            output = outcome.final_content;

            if todos.is_empty() {
                log::info!("[SUPERVISOR] All todos complete after {} iteration(s)", iterations);
                break;
            }
            note = Some(output.clone());
        }

        if !todos.is_empty() {
            log::warn!(
                "[SUPERVISOR] Stopped at iteration cap with {} todo(s) left",
                todos.len()
            );
        }

        Ok(SupervisorOutcome {
            output,
            todos: todos.items().to_vec(),
            thread_id: thread_id.to_string(),
            iterations,
        })
    }
}
