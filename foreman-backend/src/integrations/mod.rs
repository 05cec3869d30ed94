//! Seams to the outside world: the semantic tool index and the integration
//! broker that holds OAuth connections and runs third-party tools.

pub mod composio;
pub mod toolhub;

pub use composio::ComposioClient;
pub use toolhub::ToolHubClient;

use crate::catalog::{ToolDefinition, ToolParameter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One semantic-search match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f64,
    /// Parameters the index knows about, used when the broker has no schema
    #[serde(default)]
    pub parameters: Option<Vec<ToolParameter>>,
}

/// Semantic index over broker tool descriptions
#[async_trait]
pub trait ToolSearch: Send + Sync {
    async fn query(
        &self,
        text: &str,
        integration: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, String>;
}

/// Search backend used when no index is configured; finds nothing
pub struct DisabledToolSearch;

#[async_trait]
impl ToolSearch for DisabledToolSearch {
    async fn query(&self, _text: &str, _integration: Option<&str>, _top_k: usize) -> Result<Vec<SearchHit>, String> {
        log::debug!("[DISCOVERY] Tool search is not configured (set TOOL_HUB_URL)");
        Ok(Vec::new())
    }
}

/// One broker tool call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub user_id: String,
    pub connected_account_id: Option<String>,
    pub arguments: Value,
}

/// Tool schemas and tool execution on the broker
#[async_trait]
pub trait IntegrationBroker: Send + Sync {
    /// Schemas for the named tools; unknown names are simply absent
    async fn get_schemas(&self, user_id: &str, tool_names: &[String]) -> Result<Vec<ToolDefinition>, String>;

    /// Run a tool; `Err` carries the broker's failure message
    async fn invoke(&self, invocation: ToolInvocation) -> Result<Value, String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub toolkit_slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountFilter {
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub toolkit_slugs: Vec<String>,
    #[serde(default)]
    pub auth_config_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionRequest {
    pub connection_id: Option<String>,
    pub redirect_url: Option<String>,
}

/// OAuth account management, exposed through the HTTP proxy endpoints
#[async_trait]
pub trait AccountLinker: Send + Sync {
    async fn list_connected_accounts(&self, filter: &AccountFilter) -> Result<Vec<ConnectedAccount>, String>;

    async fn initiate_connection(
        &self,
        user_id: &str,
        auth_config_id: &str,
        callback_url: Option<&str>,
    ) -> Result<ConnectionRequest, String>;

    async fn wait_for_connection(&self, connection_id: &str, timeout_ms: u64) -> Result<ConnectedAccount, String>;

    async fn delete_connected_account(&self, account_id: &str) -> Result<(), String>;

    /// Raw broker execution for the proxy endpoint
    async fn execute_tool(&self, invocation: ToolInvocation) -> Result<Value, String>;
}
