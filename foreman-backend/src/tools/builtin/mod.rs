//! Agent-facing tools.

pub mod execute_tool;
pub mod memory;
pub mod search_tools;
pub mod spawn_worker;
pub mod think;
pub mod write_todos;

pub use execute_tool::ExecuteToolTool;
pub use memory::{ReadMemoryTool, WriteMemoryTool};
pub use search_tools::SearchToolsTool;
pub use spawn_worker::SpawnWorkerTool;
pub use think::ThinkTool;
pub use write_todos::WriteTodosTool;
