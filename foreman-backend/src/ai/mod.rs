pub mod mock;
pub mod openai;
pub mod types;

pub use mock::MockAiClient;
pub use openai::OpenAIClient;
pub use types::{AiError, AiResponse, ToolCall, ToolHistoryEntry, ToolResponse};

use crate::tools::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        write!(f, "{}", role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat-completion backend used by every agent and by the LLM plan deriver.
///
/// Implementations own their retry policy; an `Err` here means the provider
/// stayed unavailable after retries.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a response with the given tools available
    async fn generate_with_tools(
        &self,
        messages: Vec<Message>,
        tool_history: Vec<ToolHistoryEntry>,
        tools: Vec<ToolSpec>,
    ) -> Result<AiResponse, AiError>;

    /// Generate a response that must call `tool`.
    ///
    /// Providers without forced tool choice fall back to offering the tool
    /// as the only option.
    async fn generate_forced_tool(
        &self,
        messages: Vec<Message>,
        tool: ToolSpec,
    ) -> Result<AiResponse, AiError> {
        self.generate_with_tools(messages, vec![], vec![tool]).await
    }

    /// Model identifier, for logs
    fn model_name(&self) -> &str;
}
