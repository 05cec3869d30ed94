//! Execution gateway
//!
//! The only path from an agent to a broker tool call. A call goes through,
//! in order: argument parsing, nested-JSON normalization, the plan gate
//! (which consumes the plan), schema validation, and broker invocation.

mod gateway;
mod normalize;

pub use gateway::ExecutionGateway;
pub use normalize::normalize_nested_json;
