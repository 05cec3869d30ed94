//! In-process fakes for the search index and broker, shared by unit tests.

use crate::catalog::{tool_domain, ToolDefinition};
use crate::integrations::{
    AccountFilter, AccountLinker, ConnectedAccount, ConnectionRequest, IntegrationBroker, SearchHit, ToolInvocation,
    ToolSearch,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns its fixed hits, filtered by domain prefix when one is given
pub struct FakeSearch {
    hits: Vec<SearchHit>,
    fail: bool,
    pub queries: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeSearch {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        FakeSearch {
            hits,
            fail: false,
            queries: Mutex::new(vec![]),
        }
    }

    pub fn failing() -> Self {
        FakeSearch {
            fail: true,
            ..Self::new(vec![])
        }
    }
}

#[async_trait]
impl ToolSearch for FakeSearch {
    async fn query(&self, text: &str, integration: Option<&str>, _top_k: usize) -> Result<Vec<SearchHit>, String> {
        self.queries
            .lock()
            .push((text.to_string(), integration.map(str::to_string)));
        if self.fail {
            return Err("index unavailable".to_string());
        }
        Ok(self
            .hits
            .iter()
            .filter(|h| match integration {
                Some(domain) => tool_domain(&h.name).as_deref() == Some(domain),
                None => true,
            })
            .cloned()
            .collect())
    }
}

/// Serves configured schemas, records every invocation and counts calls
#[derive(Default)]
pub struct FakeBroker {
    schemas: Mutex<HashMap<String, ToolDefinition>>,
    results: Mutex<HashMap<String, Result<Value, String>>>,
    fail_schemas: bool,
    schema_requests: AtomicUsize,
    pub invocations: Mutex<Vec<ToolInvocation>>,
}

impl FakeBroker {
    pub fn failing() -> Self {
        FakeBroker {
            fail_schemas: true,
            ..Default::default()
        }
    }

    pub fn with_schema(self, definition: ToolDefinition) -> Self {
        self.schemas.lock().insert(definition.name.clone(), definition);
        self
    }

    pub fn with_result(self, tool_name: &str, result: Result<Value, String>) -> Self {
        self.results.lock().insert(tool_name.to_string(), result);
        self
    }

    pub fn schema_requests(&self) -> usize {
        self.schema_requests.load(Ordering::SeqCst)
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().len()
    }
}

#[async_trait]
impl IntegrationBroker for FakeBroker {
    async fn get_schemas(&self, _user_id: &str, tool_names: &[String]) -> Result<Vec<ToolDefinition>, String> {
        self.schema_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_schemas {
            return Err("broker unavailable".to_string());
        }
        let schemas = self.schemas.lock();
        Ok(tool_names
            .iter()
            .filter_map(|name| schemas.get(name).cloned())
            .collect())
    }

    async fn invoke(&self, invocation: ToolInvocation) -> Result<Value, String> {
        let result = self
            .results
            .lock()
            .get(&invocation.tool_name)
            .cloned()
            .unwrap_or_else(|| Ok(json!({"ok": true, "tool": invocation.tool_name})));
        self.invocations.lock().push(invocation);
        result
    }
}

/// Linker over a fixed account list; connection requests always redirect
#[async_trait]
impl AccountLinker for FakeBroker {
    async fn list_connected_accounts(&self, filter: &AccountFilter) -> Result<Vec<ConnectedAccount>, String> {
        let account = ConnectedAccount {
            id: "ca_1".to_string(),
            status: "ACTIVE".to_string(),
            user_id: Some("user-1".to_string()),
            toolkit_slug: Some("github".to_string()),
        };
        let matches = filter.toolkit_slugs.is_empty() || filter.toolkit_slugs.iter().any(|s| s == "github");
        Ok(if matches { vec![account] } else { vec![] })
    }

    async fn initiate_connection(
        &self,
        user_id: &str,
        auth_config_id: &str,
        _callback_url: Option<&str>,
    ) -> Result<ConnectionRequest, String> {
        if auth_config_id == "ac_missing" {
            return Ok(ConnectionRequest {
                connection_id: None,
                redirect_url: None,
            });
        }
        Ok(ConnectionRequest {
            connection_id: Some(format!("conn-{}", user_id)),
            redirect_url: Some("https://auth.example/redirect".to_string()),
        })
    }

    async fn wait_for_connection(&self, connection_id: &str, timeout_ms: u64) -> Result<ConnectedAccount, String> {
        if timeout_ms == 0 {
            return Err(format!("Connection {} timed out", connection_id));
        }
        Ok(ConnectedAccount {
            id: connection_id.to_string(),
            status: "ACTIVE".to_string(),
            user_id: None,
            toolkit_slug: None,
        })
    }

    async fn delete_connected_account(&self, account_id: &str) -> Result<(), String> {
        if account_id == "ca_unknown" {
            return Err("Connected account not found".to_string());
        }
        Ok(())
    }

    async fn execute_tool(&self, invocation: ToolInvocation) -> Result<Value, String> {
        self.invoke(invocation).await
    }
}
