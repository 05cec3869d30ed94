//! Composio v3 REST client: tool schemas, tool execution and connected
//! account management.

use crate::catalog::ToolDefinition;
use crate::integrations::{
    AccountFilter, AccountLinker, ConnectedAccount, ConnectionRequest, IntegrationBroker, ToolInvocation,
};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://backend.composio.dev";
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct ComposioClient {
    client: Client,
    headers: header::HeaderMap,
    base_url: String,
}

impl ComposioClient {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self, String> {
        Ok(ComposioClient {
            client: crate::http::shared_client().clone(),
            headers: crate::http::json_headers("x-api-key", api_key)?,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/api/v3{}", self.base_url, path))
            .headers(self.headers.clone())
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value, String> {
        let response = request
            .send()
            .await
            .map_err(|e| format!("Composio {} request failed: {}", what, e))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            log::warn!("[COMPOSIO] {} returned {}: {}", what, status, body);
            return Err(format!("Composio {} failed ({}): {}", what, status, error_message(&body)));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| format!("Failed to parse Composio {} response: {}", what, e))
    }

    async fn get_account(&self, account_id: &str) -> Result<ConnectedAccount, String> {
        let value = self
            .send(
                self.request(Method::GET, &format!("/connected_accounts/{}", account_id)),
                "get connected account",
            )
            .await?;
        parse_account(&value).ok_or_else(|| "Composio returned an unreadable connected account".to_string())
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Tool list response (`{items: [{slug, description, input_parameters}]}`)
pub fn parse_tool_items(value: &Value) -> Vec<ToolDefinition> {
    value
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let slug = item
                        .get("slug")
                        .or_else(|| item.get("name"))
                        .and_then(Value::as_str)?;
                    let description = item.get("description").and_then(Value::as_str).unwrap_or("");
                    let schema = item
                        .get("input_parameters")
                        .or_else(|| item.get("parameters"))
                        .cloned()
                        .unwrap_or(Value::Null);
                    Some(ToolDefinition::from_json_schema(slug, description, &schema))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Execution response: `successful: false` becomes the broker's error message
pub fn parse_execute_response(value: Value) -> Result<Value, String> {
    if value.get("successful").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("error")
            .and_then(|e| e.as_str().map(str::to_string).or_else(|| Some(e.to_string())))
            .filter(|m| !m.is_empty() && m != "null")
            .unwrap_or_else(|| "tool execution was not successful".to_string());
        return Err(message);
    }
    match value {
        Value::Object(mut map) if map.contains_key("data") => Ok(map.remove("data").unwrap_or(Value::Null)),
        other => Ok(other),
    }
}

fn parse_account(item: &Value) -> Option<ConnectedAccount> {
    let id = item.get("id").and_then(Value::as_str)?;
    Some(ConnectedAccount {
        id: id.to_string(),
        status: item
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string(),
        user_id: item.get("user_id").and_then(Value::as_str).map(str::to_string),
        toolkit_slug: item
            .pointer("/toolkit/slug")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

pub fn parse_account_items(value: &Value) -> Vec<ConnectedAccount> {
    value
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_account).collect())
        .unwrap_or_default()
}

fn parse_connection_request(value: &Value) -> ConnectionRequest {
    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| value.get(*n).and_then(Value::as_str))
            .map(str::to_string)
    };
    ConnectionRequest {
        connection_id: field(&["connected_account_id", "id", "connectionId"]),
        redirect_url: field(&["redirect_url", "redirectUrl"]),
    }
}

fn is_terminal_status(status: &str) -> bool {
    matches!(
        status.to_uppercase().as_str(),
        "ACTIVE" | "FAILED" | "EXPIRED" | "INACTIVE"
    )
}

#[async_trait]
impl IntegrationBroker for ComposioClient {
    async fn get_schemas(&self, _user_id: &str, tool_names: &[String]) -> Result<Vec<ToolDefinition>, String> {
        if tool_names.is_empty() {
            return Ok(vec![]);
        }
        log::debug!("[COMPOSIO] Fetching schemas for {:?}", tool_names);
        let request = self.request(Method::GET, "/tools").query(&[
            ("tool_slugs", tool_names.join(",")),
            ("limit", tool_names.len().to_string()),
        ]);
        let value = self.send(request, "tool schema").await?;
        Ok(parse_tool_items(&value))
    }

    async fn invoke(&self, invocation: ToolInvocation) -> Result<Value, String> {
        log::info!(
            "[COMPOSIO] Executing {} for user {} (account: {:?})",
            invocation.tool_name,
            invocation.user_id,
            invocation.connected_account_id
        );
        let mut body = json!({
            "user_id": invocation.user_id,
            "arguments": invocation.arguments,
        });
        if let Some(account) = &invocation.connected_account_id {
            body["connected_account_id"] = json!(account);
        }
        let request = self
            .request(Method::POST, &format!("/tools/execute/{}", invocation.tool_name))
            .json(&body);
        let value = self.send(request, "tool execution").await?;
        parse_execute_response(value)
    }
}

#[async_trait]
impl AccountLinker for ComposioClient {
    async fn list_connected_accounts(&self, filter: &AccountFilter) -> Result<Vec<ConnectedAccount>, String> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if !filter.user_ids.is_empty() {
            query.push(("user_ids", filter.user_ids.join(",")));
        }
        if !filter.toolkit_slugs.is_empty() {
            query.push(("toolkit_slugs", filter.toolkit_slugs.join(",")));
        }
        if !filter.auth_config_ids.is_empty() {
            query.push(("auth_config_ids", filter.auth_config_ids.join(",")));
        }
        let value = self
            .send(
                self.request(Method::GET, "/connected_accounts").query(&query),
                "list connected accounts",
            )
            .await?;
        Ok(parse_account_items(&value))
    }

    async fn initiate_connection(
        &self,
        user_id: &str,
        auth_config_id: &str,
        callback_url: Option<&str>,
    ) -> Result<ConnectionRequest, String> {
        let mut body = json!({ "user_id": user_id, "auth_config_id": auth_config_id });
        if let Some(url) = callback_url {
            body["callback_url"] = json!(url);
        }
        let value = self
            .send(
                self.request(Method::POST, "/connected_accounts/link").json(&body),
                "initiate connection",
            )
            .await?;
        Ok(parse_connection_request(&value))
    }

    async fn wait_for_connection(&self, connection_id: &str, timeout_ms: u64) -> Result<ConnectedAccount, String> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let account = self.get_account(connection_id).await?;
            if is_terminal_status(&account.status) {
                return Ok(account);
            }
            if Instant::now() >= deadline {
                return Err(format!(
                    "Connection {} still {} after {}ms",
                    connection_id, account.status, timeout_ms
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn delete_connected_account(&self, account_id: &str) -> Result<(), String> {
        self.send(
            self.request(Method::DELETE, &format!("/connected_accounts/{}", account_id)),
            "delete connected account",
        )
        .await
        .map(|_| ())
    }

    async fn execute_tool(&self, invocation: ToolInvocation) -> Result<Value, String> {
        self.invoke(invocation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ParamType;

    #[test]
    fn test_parse_tool_items() {
        let tools = parse_tool_items(&json!({
            "items": [{
                "slug": "ASANA_CREATE_TASK",
                "description": "Create a task",
                "input_parameters": {
                    "properties": {
                        "name": {"type": "string"},
                        "workspace": {"type": "string"},
                        "due_on": {"type": ["string", "null"]}
                    },
                    "required": ["name", "workspace"]
                }
            }, {
                "description": "no slug, skipped"
            }]
        }));

        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "ASANA_CREATE_TASK");
        assert_eq!(tools[0].required_parameters().count(), 2);
        assert_eq!(tools[0].parameter("due_on").unwrap().param_type, ParamType::String);
    }

    #[test]
    fn test_parse_execute_response() {
        let ok = parse_execute_response(json!({"data": {"id": 7}, "successful": true, "error": null}));
        assert_eq!(ok.unwrap(), json!({"id": 7}));

        let err = parse_execute_response(json!({"data": {}, "successful": false, "error": "Not Found"}));
        assert_eq!(err.unwrap_err(), "Not Found");

        let bare = parse_execute_response(json!([1, 2]));
        assert_eq!(bare.unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_parse_accounts_and_connection_request() {
        let accounts = parse_account_items(&json!({
            "items": [{"id": "ca_1", "status": "ACTIVE", "user_id": "u", "toolkit": {"slug": "github"}}]
        }));
        assert_eq!(accounts[0].toolkit_slug.as_deref(), Some("github"));

        let request = parse_connection_request(&json!({"redirect_url": "https://x", "connected_account_id": "ca_9"}));
        assert_eq!(request.connection_id.as_deref(), Some("ca_9"));
        assert_eq!(request.redirect_url.as_deref(), Some("https://x"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error": {"message": "bad key"}}"#), "bad key");
        assert_eq!(error_message("plain"), "plain");
        assert!(is_terminal_status("active"));
        assert!(!is_terminal_status("INITIATED"));
    }
}
