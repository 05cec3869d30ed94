//! Error taxonomy for agent tool calls.
//!
//! Every variant renders as a message addressed to the model, so the agent
//! can correct itself; `kind()` is the stable tag used in logs and metadata.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ToolError {
    /// `execute_tool` called without a pending plan for the tool on this thread
    PlanRequired { tool_name: String },
    /// Arguments failed the schema check
    ValidationError {
        tool_name: String,
        details: String,
        planned_reasoning: Option<String>,
    },
    /// Neither the cache nor the broker could supply a schema
    SchemaUnavailable { tool_name: String },
    /// Argument string was not JSON, or not a JSON object
    InvalidArguments { message: String },
    /// Broker-side failure while running the tool
    ExecutionError { tool_name: String, message: String },
    /// A call ceiling was reached
    BudgetExceeded { scope: String, limit: u32 },
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::PlanRequired { .. } => "plan_required",
            ToolError::ValidationError { .. } => "validation_error",
            ToolError::SchemaUnavailable { .. } => "schema_unavailable",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::ExecutionError { .. } => "execution_error",
            ToolError::BudgetExceeded { .. } => "budget_exceeded",
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::PlanRequired { tool_name } => write!(
                f,
                "❌ Plan required: there is no pending execution plan for '{}'. \
                 Call think() first, name the tool and give every required parameter \
                 with its value (e.g. owner='acme', repo='api'), then call execute_tool again.",
                tool_name
            ),
            ToolError::ValidationError {
                tool_name,
                details,
                planned_reasoning,
            } => {
                write!(f, "❌ Parameter validation error for '{}':\n{}", tool_name, details)?;
                if let Some(reasoning) = planned_reasoning {
                    write!(f, "\n\nYour plan said: {}", reasoning)?;
                }
                write!(
                    f,
                    "\n\nReview the tool schema and provide every required parameter with a non-empty value."
                )
            }
            ToolError::SchemaUnavailable { tool_name } => write!(
                f,
                "Error: no parameter schema is available for '{}'. \
                 Find it again with search_tools or pick a different tool.",
                tool_name
            ),
            ToolError::InvalidArguments { message } => {
                write!(f, "Error: params must be valid JSON string. Parse error: {}", message)
            }
            ToolError::ExecutionError { tool_name, message } => {
                write!(f, "Error executing {}: {}", tool_name, message)
            }
            ToolError::BudgetExceeded { scope, limit } => write!(
                f,
                "Tool call limit reached: {} allows at most {} calls. Stop calling tools and report what you have.",
                scope, limit
            ),
        }
    }
}

impl std::error::Error for ToolError {}
