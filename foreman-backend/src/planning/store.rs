//! Pending execution plans, keyed by (thread, tool).

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// A declared, schema-valid intent to call one broker tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub tool_name: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl ExecutionPlan {
    pub fn new(tool_name: impl Into<String>, reasoning: impl Into<String>, params: Map<String, Value>) -> Self {
        ExecutionPlan {
            tool_name: tool_name.into(),
            reasoning: reasoning.into(),
            params,
        }
    }
}

struct StoredPlan {
    plan: ExecutionPlan,
    recorded_at: Instant,
}

/// At most one pending plan per (thread, tool). Plans older than the TTL are
/// treated as absent and dropped on access.
pub struct PlanStore {
    plans: DashMap<(String, String), StoredPlan>,
    ttl: Option<Duration>,
}

impl PlanStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        PlanStore {
            plans: DashMap::new(),
            ttl,
        }
    }

    fn key(thread_id: &str, tool_name: &str) -> (String, String) {
        (thread_id.to_string(), tool_name.to_string())
    }

    fn is_expired(&self, stored: &StoredPlan) -> bool {
        self.ttl
            .map(|ttl| stored.recorded_at.elapsed() > ttl)
            .unwrap_or(false)
    }

    /// Record a plan, replacing any pending plan for the same tool on this thread
    pub fn upsert(&self, thread_id: &str, plan: ExecutionPlan) -> Option<ExecutionPlan> {
        let key = Self::key(thread_id, &plan.tool_name);
        log::debug!("[PLAN] Recording plan for {} on thread {}", plan.tool_name, thread_id);
        self.plans
            .insert(
                key,
                StoredPlan {
                    plan,
                    recorded_at: Instant::now(),
                },
            )
            .map(|previous| previous.plan)
    }

    /// Pending plan without consuming it
    pub fn peek(&self, thread_id: &str, tool_name: &str) -> Option<ExecutionPlan> {
        let key = Self::key(thread_id, tool_name);
        let expired = match self.plans.get(&key) {
            Some(stored) if !self.is_expired(&stored) => return Some(stored.plan.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.plans.remove(&key);
        }
        None
    }

    /// Remove and return the pending plan; single use
    pub fn take(&self, thread_id: &str, tool_name: &str) -> Option<ExecutionPlan> {
        let (_, stored) = self.plans.remove(&Self::key(thread_id, tool_name))?;
        if self.is_expired(&stored) {
            log::info!(
                "[PLAN] Plan for {} on thread {} expired before execution",
                tool_name,
                thread_id
            );
            return None;
        }
        Some(stored.plan)
    }

    /// Drop every pending plan for a thread
    pub fn clear_thread(&self, thread_id: &str) {
        self.plans.retain(|(thread, _), _| thread != thread_id);
    }

    pub fn pending_count(&self, thread_id: &str) -> usize {
        self.plans
            .iter()
            .filter(|entry| entry.key().0 == thread_id && !self.is_expired(entry.value()))
            .count()
    }
}

impl Default for PlanStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(tool: &str, owner: &str) -> ExecutionPlan {
        let mut params = Map::new();
        params.insert("owner".to_string(), json!(owner));
        ExecutionPlan::new(tool, "because", params)
    }

    #[test]
    fn test_take_is_single_use() {
        let store = PlanStore::default();
        store.upsert("t1", plan("GITHUB_GET_REPO", "acme"));

        assert!(store.take("t1", "GITHUB_GET_REPO").is_some());
        assert!(store.take("t1", "GITHUB_GET_REPO").is_none());
    }

    #[test]
    fn test_upsert_replaces_previous_plan() {
        let store = PlanStore::default();
        assert!(store.upsert("t1", plan("GITHUB_GET_REPO", "old")).is_none());
        let previous = store.upsert("t1", plan("GITHUB_GET_REPO", "new")).unwrap();
        assert_eq!(previous.params["owner"], "old");
        assert_eq!(store.peek("t1", "GITHUB_GET_REPO").unwrap().params["owner"], "new");
        assert_eq!(store.pending_count("t1"), 1);
    }

    #[test]
    fn test_plans_are_thread_scoped() {
        let store = PlanStore::default();
        store.upsert("worker-a", plan("GITHUB_GET_REPO", "acme"));
        assert!(store.take("worker-b", "GITHUB_GET_REPO").is_none());
        assert!(store.peek("worker-a", "GITHUB_GET_REPO").is_some());
    }

    #[test]
    fn test_expired_plan_treated_as_absent() {
        let store = PlanStore::new(Some(Duration::from_millis(1)));
        store.upsert("t1", plan("GITHUB_GET_REPO", "acme"));
        std::thread::sleep(Duration::from_millis(10));

        assert!(store.peek("t1", "GITHUB_GET_REPO").is_none());
        store.upsert("t1", plan("SLACK_POST", "acme"));
        std::thread::sleep(Duration::from_millis(10));
        assert!(store.take("t1", "SLACK_POST").is_none());
        assert_eq!(store.pending_count("t1"), 0);
    }

    #[test]
    fn test_clear_thread() {
        let store = PlanStore::default();
        store.upsert("t1", plan("A_X", "1"));
        store.upsert("t1", plan("B_Y", "1"));
        store.upsert("t2", plan("A_X", "1"));
        store.clear_thread("t1");
        assert_eq!(store.pending_count("t1"), 0);
        assert_eq!(store.pending_count("t2"), 1);
    }
}
