//! Two-tier agents: a supervisor that plans and delegates, and workers that
//! discover, plan and execute broker tools.

pub mod budget;
pub mod prompts;
pub mod supervisor;
pub mod todos;
pub mod tool_loop;
pub mod worker;

pub use budget::{AgentBudgetConfig, AgentLimits, ThreadCallCounters, ToolCallBudget, ToolCallLimit};
pub use supervisor::{Supervisor, SupervisorOutcome, SupervisorRequest};
pub use todos::{TodoItem, TodoList};
pub use worker::{WorkerResponse, WorkerRunner, WorkerStatus, WorkerTask};

use crate::tools::ToolGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Supervisor,
    Worker,
}

impl AgentKind {
    /// Tool groups this agent may call
    pub fn allowed_groups(self) -> &'static [ToolGroup] {
        match self {
            AgentKind::Supervisor => &[
                ToolGroup::Reasoning,
                ToolGroup::Planning,
                ToolGroup::Delegation,
                ToolGroup::Memory,
            ],
            AgentKind::Worker => &[ToolGroup::Reasoning, ToolGroup::Discovery, ToolGroup::Execution],
        }
    }
}
