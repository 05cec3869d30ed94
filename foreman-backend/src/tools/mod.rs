pub mod builtin;
pub mod registry;
pub mod types;

pub use registry::{Tool, ToolRegistry};
pub use types::{PropertySchema, ToolContext, ToolGroup, ToolInputSchema, ToolResult, ToolSpec};

use crate::agents::worker::WorkerRunner;
use crate::context::RunContext;
use std::sync::Arc;

/// Tools a worker may call: think, search_tools, execute_tool
pub fn create_worker_registry(run: &Arc<RunContext>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(builtin::ThinkTool::new(run.clone())));
    registry.register(Arc::new(builtin::SearchToolsTool::new(run.clone())));
    registry.register(Arc::new(builtin::ExecuteToolTool::new(run.clone())));
    registry
}

/// Tools the supervisor may call. Built per run so the registry never
/// outlives the worker runner it delegates to.
pub fn create_supervisor_registry(run: &Arc<RunContext>, runner: Arc<WorkerRunner>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(builtin::ThinkTool::new(run.clone())));
    registry.register(Arc::new(builtin::WriteTodosTool::new()));
    registry.register(Arc::new(builtin::SpawnWorkerTool::new(runner)));
    registry.register(Arc::new(builtin::WriteMemoryTool::new(run.artifacts.clone())));
    registry.register(Arc::new(builtin::ReadMemoryTool::new(run.artifacts.clone())));
    registry
}
