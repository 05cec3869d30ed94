use crate::ai::types::{AiError, AiResponse, ToolCall, ToolHistoryEntry, ToolResponse};
use crate::ai::{ChatModel, Message};
use crate::tools::ToolSpec;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-5-mini";

// Retry configuration for transient errors
const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 2000;

/// OpenAI chat-completions client with function calling.
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize, Clone)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIFunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as the API sends them
    #[serde(default)]
    pub arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    message: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, endpoint: Option<&str>, model: Option<&str>) -> Result<Self, String> {
        let bearer = if api_key.is_empty() {
            String::new()
        } else {
            format!("Bearer {}", api_key)
        };
        let auth_headers = crate::http::json_headers("authorization", &bearer)?;

        Ok(Self {
            client: crate::http::shared_client().clone(),
            auth_headers,
            endpoint: endpoint.unwrap_or(DEFAULT_ENDPOINT).to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            temperature: None,
        })
    }

    /// Sampling temperature; the plan extractor runs at 0
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Convert one round of tool calls and results into the assistant/tool
    /// message pair the chat-completions API expects.
    pub fn build_tool_result_messages(
        assistant_content: &str,
        tool_calls: &[ToolCall],
        tool_responses: &[ToolResponse],
    ) -> Vec<OpenAIMessage> {
        let mut messages = Vec::with_capacity(tool_responses.len() + 1);
        messages.push(OpenAIMessage {
            role: "assistant".to_string(),
            content: Some(assistant_content.to_string()).filter(|c| !c.trim().is_empty()),
            tool_calls: Some(
                tool_calls
                    .iter()
                    .map(|tc| OpenAIToolCall {
                        id: tc.id.clone(),
                        call_type: function_type(),
                        function: OpenAIFunctionCall {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect(),
            ),
            tool_call_id: None,
        });
        for response in tool_responses {
            messages.push(OpenAIMessage {
                role: "tool".to_string(),
                content: Some(response.content.clone()),
                tool_calls: None,
                tool_call_id: Some(response.tool_call_id.clone()),
            });
        }
        messages
    }

    fn build_messages(messages: Vec<Message>, tool_history: &[ToolHistoryEntry]) -> Vec<OpenAIMessage> {
        let mut api_messages: Vec<OpenAIMessage> = messages
            .into_iter()
            .map(|m| OpenAIMessage {
                role: m.role.to_string(),
                content: Some(m.content),
                tool_calls: None,
                tool_call_id: None,
            })
            .collect();
        for entry in tool_history {
            api_messages.extend(Self::build_tool_result_messages(
                &entry.assistant_content,
                &entry.tool_calls,
                &entry.tool_responses,
            ));
        }
        api_messages
    }

    fn build_tools(tools: Vec<ToolSpec>) -> Option<Vec<OpenAITool>> {
        if tools.is_empty() {
            return None;
        }
        Some(
            tools
                .into_iter()
                .map(|t| OpenAITool {
                    tool_type: "function".to_string(),
                    function: OpenAIFunction {
                        name: t.name,
                        description: t.description,
                        parameters: serde_json::to_value(t.input_schema).unwrap_or_default(),
                    },
                })
                .collect(),
        )
    }

    async fn send(&self, request: OpenAIChatRequest) -> Result<AiResponse, AiError> {
        log::debug!(
            "[OPENAI] Sending request to {} with {} messages",
            self.endpoint,
            request.messages.len()
        );

        let mut last_error: Option<AiError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay_ms = BASE_DELAY_MS * (1 << (attempt - 1));
                log::warn!(
                    "[OPENAI] Retry attempt {}/{} after {}ms delay",
                    attempt,
                    MAX_RETRIES,
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            let request_result = self
                .client
                .post(&self.endpoint)
                .headers(self.auth_headers.clone())
                .timeout(Duration::from_secs(300))
                .json(&request)
                .send()
                .await;

            let response = match request_result {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("[OPENAI] Request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(AiError::new(format!("OpenAI API request failed: {}", e)));
                    continue;
                }
            };

            let status_code = response.status().as_u16();
            if !response.status().is_success() {
                let error_text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OpenAIErrorResponse>(&error_text)
                    .map(|e| e.error.message)
                    .unwrap_or(error_text);
                let error = AiError::with_status(format!("OpenAI API error: {}", message), status_code);

                if error.is_retryable() && attempt < MAX_RETRIES {
                    log::warn!(
                        "[OPENAI] Received retryable status {} (attempt {}), will retry",
                        status_code,
                        attempt + 1
                    );
                    last_error = Some(error);
                    continue;
                }
                return Err(error);
            }

            let data: OpenAIChatResponse = response
                .json()
                .await
                .map_err(|e| AiError::new(format!("Failed to parse OpenAI response: {}", e)))?;
            return Self::into_ai_response(data);
        }

        Err(last_error.unwrap_or_else(|| AiError::new("Max retries exceeded")))
    }

    fn into_ai_response(data: OpenAIChatResponse) -> Result<AiResponse, AiError> {
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::new("OpenAI API returned no choices"))?;

        let content = choice.message.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                // Malformed arguments are passed through as a string so the
                // tool can report the parse failure back to the model.
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments));
                ToolCall::new(tc.id, tc.function.name, arguments)
            })
            .collect();

        if tool_calls.is_empty() {
            let mut response = AiResponse::text(content);
            response.stop_reason = choice.finish_reason;
            Ok(response)
        } else {
            Ok(AiResponse::with_tools(content, tool_calls))
        }
    }
}

#[async_trait]
impl ChatModel for OpenAIClient {
    async fn generate_with_tools(
        &self,
        messages: Vec<Message>,
        tool_history: Vec<ToolHistoryEntry>,
        tools: Vec<ToolSpec>,
    ) -> Result<AiResponse, AiError> {
        let request = OpenAIChatRequest {
            model: self.model.clone(),
            messages: Self::build_messages(messages, &tool_history),
            tools: Self::build_tools(tools),
            tool_choice: None,
            temperature: self.temperature,
        };
        self.send(request).await
    }

    async fn generate_forced_tool(
        &self,
        messages: Vec<Message>,
        tool: ToolSpec,
    ) -> Result<AiResponse, AiError> {
        let tool_choice = json!({ "type": "function", "function": { "name": tool.name } });
        let request = OpenAIChatRequest {
            model: self.model.clone(),
            messages: Self::build_messages(messages, &[]),
            tools: Self::build_tools(vec![tool]),
            tool_choice: Some(tool_choice),
            temperature: self.temperature,
        };
        self.send(request).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
