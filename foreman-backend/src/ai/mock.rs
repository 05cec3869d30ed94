//! Scripted chat model for tests and offline runs.

use crate::ai::types::{AiError, AiResponse, ToolHistoryEntry};
use crate::ai::{ChatModel, Message};
use crate::tools::ToolSpec;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// One captured `generate_*` call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_history: Vec<ToolHistoryEntry>,
    pub tool_names: Vec<String>,
}

/// Returns queued responses in order and records every request.
///
/// Once the queue is drained every further call fails, which ends any agent
/// loop that is still asking for turns.
#[derive(Default)]
pub struct MockAiClient {
    responses: Mutex<VecDeque<Result<AiResponse, AiError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockAiClient {
    pub fn new(responses: Vec<AiResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, response: AiResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    pub fn push_error(&self, error: AiError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl ChatModel for MockAiClient {
    async fn generate_with_tools(
        &self,
        messages: Vec<Message>,
        tool_history: Vec<ToolHistoryEntry>,
        tools: Vec<ToolSpec>,
    ) -> Result<AiResponse, AiError> {
        self.requests.lock().push(RecordedRequest {
            messages,
            tool_history,
            tool_names: tools.into_iter().map(|t| t.name).collect(),
        });
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::new("MockAiClient: no scripted response left")))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ToolCall;
    use serde_json::json;

    #[tokio::test]
    async fn test_responses_returned_in_order_then_error() {
        let mock = MockAiClient::new(vec![
            AiResponse::with_tools("", vec![ToolCall::new("c1", "think", json!({}))]),
            AiResponse::text("done"),
        ]);

        let first = mock.generate_with_tools(vec![Message::user("hi")], vec![], vec![]).await.unwrap();
        assert!(first.has_tool_calls());
        let second = mock.generate_with_tools(vec![], vec![], vec![]).await.unwrap();
        assert_eq!(second.content, "done");
        assert!(mock.generate_with_tools(vec![], vec![], vec![]).await.is_err());

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.requests()[0].messages[0].content, "hi");
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let mock = MockAiClient::default();
        mock.push_error(AiError::with_status("down", 503));
        let err = mock.generate_with_tools(vec![], vec![], vec![]).await.unwrap_err();
        assert_eq!(err.status_code, Some(503));
    }
}
