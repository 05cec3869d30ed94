use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumString};

/// Tool groups decide which agent may see a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToolGroup {
    /// Scratchpad reasoning (`think`)
    Reasoning,
    /// Catalog lookup (`search_tools`)
    Discovery,
    /// Integration calls (`execute_tool`)
    Execution,
    /// Todo management (`write_todos`)
    Planning,
    /// Handing work to workers (`spawn_worker`)
    Delegation,
    /// Artifact handoff between workers
    Memory,
}

/// JSON-schema property as sent to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl PropertySchema {
    pub fn new(schema_type: &str, description: &str) -> Self {
        PropertySchema {
            schema_type: schema_type.to_string(),
            description: description.to_string(),
            default: None,
            items: None,
            enum_values: None,
        }
    }

    /// Array property whose items are plain strings
    pub fn string_array(description: &str, item_description: &str) -> Self {
        PropertySchema {
            items: Some(Box::new(PropertySchema::new("string", item_description))),
            ..PropertySchema::new("array", description)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, PropertySchema>,
    pub required: Vec<String>,
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        ToolInputSchema {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: vec![],
        }
    }
}

/// Agent-facing tool definition (what the chat model sees)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
    pub group: ToolGroup,
}

/// Result of executing an agent tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    /// Structured side-channel read by the agent loop (todos, worker results)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        ToolResult {
            success: true,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Per-call context handed to every tool
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Conversation thread the call belongs to; plans are scoped to it
    pub thread_id: String,
    /// Integration domains this agent is restricted to (workers only)
    pub integrations: Vec<String>,
}

impl ToolContext {
    pub fn new(thread_id: impl Into<String>) -> Self {
        ToolContext {
            thread_id: thread_id.into(),
            integrations: vec![],
        }
    }

    pub fn with_integrations(mut self, integrations: Vec<String>) -> Self {
        self.integrations = integrations;
        self
    }
}
