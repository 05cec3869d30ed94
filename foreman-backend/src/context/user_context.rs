//! Per-thread caller identity: broker user id, connected accounts, and
//! resource identifiers selected by the caller (workspace, project, repo...).

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Selection fields that carry resource identifiers, as
/// (camelCase, snake_case, stored suffix)
const RESOURCE_ID_FIELDS: &[(&str, &str, &str)] = &[
    ("workspaceGid", "workspace_gid", "workspace_gid"),
    ("projectGid", "project_gid", "project_gid"),
    ("repoId", "repo_id", "repo_id"),
    ("folderId", "folder_id", "folder_id"),
];

/// Caller-supplied context on an invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    /// Integration name -> selection object (`{id, mode, workspaceGid, ...}`)
    #[serde(default)]
    pub integrations: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserContext {
    pub user_id: Option<String>,
    /// Integration name -> broker connected-account id (`ca_...`)
    pub connected_accounts: BTreeMap<String, String>,
    /// `{integration}_{field}` -> identifier
    pub resource_ids: BTreeMap<String, String>,
}

impl UserContext {
    /// Extract identity from a request. Selections in sandbox mode and ids
    /// that are not broker account ids are skipped.
    pub fn from_request(request: &RequestContext) -> Self {
        let user_id = request
            .user_id
            .clone()
            .or_else(|| request.user_email.clone())
            .filter(|u| !u.trim().is_empty());

        let mut connected_accounts = BTreeMap::new();
        let mut resource_ids = BTreeMap::new();

        for (integration, selection) in &request.integrations {
            let Some(selection) = selection.as_object() else {
                continue;
            };

            let mode = selection.get("mode").and_then(Value::as_str);
            let account_id = selection.get("id").and_then(Value::as_str);
            match account_id {
                Some(id) if !id.starts_with("ca_") => {
                    log::warn!(
                        "[CONTEXT] Integration {} has non-account id '{}', skipping",
                        integration,
                        id
                    );
                }
                Some(id) if mode != Some("sandbox") => {
                    connected_accounts.insert(integration.clone(), id.to_string());
                }
                _ => {}
            }

            for (camel, snake, suffix) in RESOURCE_ID_FIELDS {
                let value = selection
                    .get(*camel)
                    .or_else(|| selection.get(*snake))
                    .and_then(value_as_identifier);
                if let Some(value) = value {
                    resource_ids.insert(format!("{}_{}", integration, suffix), value);
                }
            }
        }

        UserContext {
            user_id,
            connected_accounts,
            resource_ids,
        }
    }

    /// Resource ids as prompt lines, e.g. `- Asana Workspace Gid: 1208`
    pub fn format_resource_ids(&self) -> String {
        self.resource_ids
            .iter()
            .map(|(key, value)| format!("- {}: {}", title_case(key), value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn value_as_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identity used for one broker call
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationIdentity {
    pub user_id: String,
    pub connected_account_id: Option<String>,
}

/// Thread-scoped store of [`UserContext`]
pub struct UserContextStore {
    contexts: DashMap<String, UserContext>,
    fallback_user_id: String,
}

impl UserContextStore {
    pub fn new(fallback_user_id: impl Into<String>) -> Self {
        let fallback_user_id = fallback_user_id.into();
        UserContextStore {
            contexts: DashMap::new(),
            fallback_user_id: if fallback_user_id.is_empty() {
                "default".to_string()
            } else {
                fallback_user_id
            },
        }
    }

    pub fn store(&self, thread_id: &str, context: UserContext) {
        log::info!(
            "[CONTEXT] Thread {}: user={:?}, accounts={:?}, resources={}",
            thread_id,
            context.user_id,
            context.connected_accounts.keys().collect::<Vec<_>>(),
            context.resource_ids.len()
        );
        self.contexts.insert(thread_id.to_string(), context);
    }

    /// Stored context, or an empty one
    pub fn get(&self, thread_id: &str) -> UserContext {
        self.contexts
            .get(thread_id)
            .map(|c| c.value().clone())
            .unwrap_or_default()
    }

    pub fn user_id(&self, thread_id: &str) -> String {
        self.contexts
            .get(thread_id)
            .and_then(|c| c.user_id.clone())
            .unwrap_or_else(|| self.fallback_user_id.clone())
    }

    pub fn resource_ids(&self, thread_id: &str) -> BTreeMap<String, String> {
        self.contexts
            .get(thread_id)
            .map(|c| c.resource_ids.clone())
            .unwrap_or_default()
    }

    /// User id plus the connected account for the tool's domain, if selected
    pub fn identity_for(&self, thread_id: &str, domain: Option<&str>) -> InvocationIdentity {
        let connected_account_id = domain.and_then(|d| {
            self.contexts
                .get(thread_id)
                .and_then(|c| c.connected_accounts.get(d).cloned())
        });
        InvocationIdentity {
            user_id: self.user_id(thread_id),
            connected_account_id,
        }
    }

    /// Copy the parent's context to a child thread
    pub fn inherit(&self, parent_thread: &str, child_thread: &str) {
        if let Some(context) = self.contexts.get(parent_thread).map(|c| c.value().clone()) {
            self.contexts.insert(child_thread.to_string(), context);
        }
    }

    pub fn clear(&self, thread_id: &str) {
        self.contexts.remove(thread_id);
    }
}
