//! Ephemeral worker agents: one todo, restricted tools, one structured result.

use crate::agents::budget::ToolCallBudget;
use crate::agents::prompts;
use crate::agents::tool_loop::{AgentLoop, LoopExit};
use crate::agents::AgentKind;
use crate::ai::Message;
use crate::artifacts::ARTIFACT_NAMESPACE;
use crate::context::RunContext;
use crate::tools::builtin::memory::artifact_text;
use crate::tools::{create_worker_registry, ToolContext};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Success,
    Failure,
    Partial,
}

/// The only thing that crosses back from a worker to the supervisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub status: WorkerStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub tool_calls_made: u32,
}

const FAILURE_MARKERS: &[&str] = &["error", "failed"];
const SUCCESS_MARKERS: &[&str] = &["success", "completed"];

impl WorkerResponse {
    pub fn failure(message: impl Into<String>, error: impl Into<String>, tool_calls_made: u32) -> Self {
        WorkerResponse {
            status: WorkerStatus::Failure,
            message: message.into(),
            error: Some(error.into()),
            tool_calls_made,
        }
    }

    /// Classify a worker's final message. Failure markers win over success
    /// markers; neither means partial.
    pub fn from_message_content(content: &str, tool_calls_made: u32) -> Self {
        let lower = content.to_lowercase();
        if content.contains('❌') || FAILURE_MARKERS.iter().any(|m| lower.contains(m)) {
            return Self::failure(content, content, tool_calls_made);
        }
        let status = if content.contains('✅') || SUCCESS_MARKERS.iter().any(|m| lower.contains(m)) {
            WorkerStatus::Success
        } else {
            WorkerStatus::Partial
        };
        WorkerResponse {
            status,
            message: content.to_string(),
            error: None,
            tool_calls_made,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl WorkerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Succeeded | WorkerState::Failed)
    }

    pub fn transition(self, next: WorkerState) -> Result<WorkerState, String> {
        match (self, next) {
            (WorkerState::Created, WorkerState::Running)
            | (WorkerState::Running, WorkerState::Succeeded)
            | (WorkerState::Running, WorkerState::Failed) => Ok(next),
            _ => Err(format!("Invalid worker transition {:?} -> {:?}", self, next)),
        }
    }

    /// Terminal state for a finished run; partial results still count as run
    pub fn for_status(status: WorkerStatus) -> WorkerState {
        match status {
            WorkerStatus::Failure => WorkerState::Failed,
            WorkerStatus::Success | WorkerStatus::Partial => WorkerState::Succeeded,
        }
    }
}

/// Thread id for a worker, stable for the same parent, instruction and step
pub fn derive_worker_thread_id(parent_thread: &str, instruction: &str, step: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent_thread.as_bytes());
    hasher.update(b"|");
    hasher.update(instruction.as_bytes());
    if let Some(step) = step {
        hasher.update(b"|");
        hasher.update(step.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("worker-{}", &digest[..8])
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerTask {
    pub instruction: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub integrations: Vec<String>,
    #[serde(default)]
    pub todo_id: Option<String>,
    #[serde(default)]
    pub artifact_keys: Vec<String>,
}

impl WorkerTask {
    pub fn new(instruction: impl Into<String>) -> Self {
        WorkerTask {
            instruction: instruction.into(),
            ..Default::default()
        }
    }
}

pub struct WorkerRunner {
    run: Arc<RunContext>,
}

impl WorkerRunner {
    pub fn new(run: Arc<RunContext>) -> Self {
        WorkerRunner { run }
    }

    /// Instruction plus the contents of any referenced artifacts
    async fn instruction_with_artifacts(&self, task: &WorkerTask) -> String {
        let mut instruction = task.instruction.clone();
        for key in &task.artifact_keys {
            match self.run.artifacts.get(ARTIFACT_NAMESPACE, key).await {
                Ok(Some(record)) => {
                    instruction.push_str(&format!("\n\n[memory:{}]\n{}", key, artifact_text(&record.value)));
                }
                Ok(None) => log::warn!("[WORKER] Artifact '{}' not found", key),
                Err(e) => log::warn!("[WORKER] Artifact '{}' unreadable: {}", key, e),
            }
        }
        instruction
    }

    pub async fn run(&self, parent_thread: &str, task: WorkerTask) -> WorkerResponse {
        let thread_id = derive_worker_thread_id(parent_thread, &task.instruction, task.todo_id.as_deref());
        let integrations: Vec<String> = task
            .integrations
            .iter()
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty())
            .collect();

        let mut state = WorkerState::Created;
        log::info!(
            "[WORKER] {} spawned from {} (integrations: {:?}): {}",
            thread_id,
            parent_thread,
            integrations,
            task.instruction
        );
        if !task.reasoning.is_empty() {
            log::info!("[WORKER] Reasoning: {}", task.reasoning);
        }

        self.run.user_context.inherit(parent_thread, &thread_id);
        let registry = create_worker_registry(&self.run);
        let context = ToolContext::new(thread_id.clone()).with_integrations(integrations.clone());
        let instruction = self.instruction_with_artifacts(&task).await;
        let resource_ids = self.run.user_context.get(&thread_id).format_resource_ids();
        let messages = vec![
            Message::system(prompts::worker_prompt(&integrations, &resource_ids)),
            Message::user(instruction),
        ];

        let mut budget = ToolCallBudget::new(
            self.run.limits.worker.clone(),
            &thread_id,
            self.run.thread_counters.clone(),
        );
        state = state.transition(WorkerState::Running).unwrap_or(state);

        let agent = AgentLoop {
            model: self.run.model.as_ref(),
            registry: &registry,
            groups: AgentKind::Worker.allowed_groups(),
            context: &context,
            label: "WORKER",
        };
        let outcome = agent.run(messages, vec![], &mut budget).await;

        let response = match outcome.exit {
            LoopExit::BudgetExceeded(reason) | LoopExit::ModelError(reason) => {
                WorkerResponse::failure(outcome.final_content, reason, outcome.tool_calls_made)
            }
            LoopExit::Finished | LoopExit::TurnLimit if outcome.final_content.trim().is_empty() => {
                WorkerResponse::failure(
                    "Worker completed but returned no message",
                    "No final message from worker",
                    outcome.tool_calls_made,
                )
            }
            LoopExit::Finished | LoopExit::TurnLimit => {
                WorkerResponse::from_message_content(&outcome.final_content, outcome.tool_calls_made)
            }
        };

        self.run.user_context.clear(&thread_id);
        self.run.plan_store.clear_thread(&thread_id);
        self.run.thread_counters.clear_thread(&thread_id);
        state = state
            .transition(WorkerState::for_status(response.status))
            .unwrap_or(state);
        log::info!(
            "[WORKER] {} finished {:?} ({:?}, {} tool calls)",
            thread_id,
            state,
            response.status,
            response.tool_calls_made
        );
        response
    }
}
