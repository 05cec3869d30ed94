//! Tool-call ceilings for supervisor and worker agents.
//!
//! Every ceiling has a thread scope (shared by every agent invocation on a
//! thread until the request that owns it finishes) and a run scope (reset
//! for each agent invocation). Limits are loaded from
//! `config/agent_limits.ron` when present.

use crate::errors::ToolError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

const LIMITS_FILE: &str = "agent_limits.ron";
const TOTAL_KEY: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallLimit {
    pub thread: u32,
    pub run: u32,
}

impl ToolCallLimit {
    pub const fn new(thread: u32, run: u32) -> Self {
        ToolCallLimit { thread, run }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBudgetConfig {
    /// Ceiling across all tools
    pub total: ToolCallLimit,
    /// Extra ceilings for individual tools
    #[serde(default)]
    pub per_tool: BTreeMap<String, ToolCallLimit>,
    #[serde(default = "default_max_model_turns")]
    pub max_model_turns: u32,
}

fn default_max_model_turns() -> u32 {
    25
}

fn default_max_supervisor_iterations() -> u32 {
    10
}

impl AgentBudgetConfig {
    pub fn supervisor_default() -> Self {
        AgentBudgetConfig {
            total: ToolCallLimit::new(30, 10),
            per_tool: BTreeMap::from([
                ("write_todos".to_string(), ToolCallLimit::new(5, 3)),
                ("spawn_worker".to_string(), ToolCallLimit::new(10, 4)),
            ]),
            max_model_turns: default_max_model_turns(),
        }
    }

    pub fn worker_default() -> Self {
        AgentBudgetConfig {
            total: ToolCallLimit::new(40, 16),
            per_tool: BTreeMap::from([
                ("search_tools".to_string(), ToolCallLimit::new(10, 6)),
                ("execute_tool".to_string(), ToolCallLimit::new(20, 10)),
            ]),
            max_model_turns: default_max_model_turns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLimits {
    pub supervisor: AgentBudgetConfig,
    pub worker: AgentBudgetConfig,
    #[serde(default = "default_max_supervisor_iterations")]
    pub max_supervisor_iterations: u32,
}

impl Default for AgentLimits {
    fn default() -> Self {
        AgentLimits {
            supervisor: AgentBudgetConfig::supervisor_default(),
            worker: AgentBudgetConfig::worker_default(),
            max_supervisor_iterations: default_max_supervisor_iterations(),
        }
    }
}

impl AgentLimits {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        ron::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    /// Check ./config first, then ../config, else built-in defaults
    pub fn load() -> Self {
        let candidates = [Path::new("./config"), Path::new("../config")];
        let path = match candidates
            .iter()
            .map(|dir| dir.join(LIMITS_FILE))
            .find(|p| p.exists())
        {
            Some(p) => p,
            None => {
                log::debug!("[LIMITS] No {} found, using defaults", LIMITS_FILE);
                return Self::default();
            }
        };

        match Self::from_file(&path) {
            Ok(limits) => {
                log::info!("[LIMITS] Loaded agent limits from {}", path.display());
                limits
            }
            Err(e) => {
                log::warn!("[LIMITS] {}; using defaults", e);
                Self::default()
            }
        }
    }
}

/// Thread-scoped call counts; the owner clears a thread when its request ends
#[derive(Default)]
pub struct ThreadCallCounters {
    counts: DashMap<(String, String), u32>,
}

impl ThreadCallCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, thread_id: &str, key: &str) -> u32 {
        self.counts
            .get(&(thread_id.to_string(), key.to_string()))
            .map(|c| *c)
            .unwrap_or(0)
    }

    fn increment(&self, thread_id: &str, key: &str) {
        *self
            .counts
            .entry((thread_id.to_string(), key.to_string()))
            .or_insert(0) += 1;
    }

    /// Total calls recorded for a thread across all tools
    pub fn total(&self, thread_id: &str) -> u32 {
        self.get(thread_id, TOTAL_KEY)
    }

    /// Drop every count for a finished thread
    pub fn clear_thread(&self, thread_id: &str) {
        self.counts.retain(|(thread, _), _| thread != thread_id);
    }
}

/// Budget for one agent invocation. A limit of N allows exactly N calls;
/// the refused call is not counted.
pub struct ToolCallBudget {
    config: AgentBudgetConfig,
    thread_id: String,
    thread_counts: Arc<ThreadCallCounters>,
    run_counts: HashMap<String, u32>,
}

impl ToolCallBudget {
    pub fn new(config: AgentBudgetConfig, thread_id: &str, thread_counts: Arc<ThreadCallCounters>) -> Self {
        ToolCallBudget {
            config,
            thread_id: thread_id.to_string(),
            thread_counts,
            run_counts: HashMap::new(),
        }
    }

    pub fn max_model_turns(&self) -> u32 {
        self.config.max_model_turns
    }

    fn run_count(&self, key: &str) -> u32 {
        self.run_counts.get(key).copied().unwrap_or(0)
    }

    fn check(&self, key: &str, label: &str, limit: ToolCallLimit) -> Result<(), ToolError> {
        if self.thread_counts.get(&self.thread_id, key) >= limit.thread {
            return Err(ToolError::BudgetExceeded {
                scope: format!("{} per thread", label),
                limit: limit.thread,
            });
        }
        if self.run_count(key) >= limit.run {
            return Err(ToolError::BudgetExceeded {
                scope: format!("{} per run", label),
                limit: limit.run,
            });
        }
        Ok(())
    }

    /// Record one call of `tool_name`, or refuse it if any ceiling is reached
    pub fn try_consume(&mut self, tool_name: &str) -> Result<(), ToolError> {
        self.check(TOTAL_KEY, "all tools", self.config.total)?;
        if let Some(limit) = self.config.per_tool.get(tool_name).copied() {
            self.check(tool_name, tool_name, limit)?;
        }

        for key in [TOTAL_KEY, tool_name] {
            self.thread_counts.increment(&self.thread_id, key);
            *self.run_counts.entry(key.to_string()).or_insert(0) += 1;
        }
        Ok(())
    }

    /// Calls recorded in this run
    pub fn calls_made(&self) -> u32 {
        self.run_count(TOTAL_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn small_config() -> AgentBudgetConfig {
        AgentBudgetConfig {
            total: ToolCallLimit::new(10, 3),
            per_tool: BTreeMap::from([("execute_tool".to_string(), ToolCallLimit::new(10, 1))]),
            max_model_turns: 5,
        }
    }

    #[test]
    fn test_shipped_limits_file_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config").join(LIMITS_FILE);
        assert_eq!(AgentLimits::from_file(&path).unwrap(), AgentLimits::default());
    }

    #[test]
    fn test_limit_of_n_allows_n_calls() {
        let counters = Arc::new(ThreadCallCounters::new());
        let mut budget = ToolCallBudget::new(small_config(), "t1", counters.clone());

        assert!(budget.try_consume("think").is_ok());
        assert!(budget.try_consume("think").is_ok());
        assert!(budget.try_consume("think").is_ok());
        let err = budget.try_consume("think").unwrap_err();
        assert_eq!(
            err,
            ToolError::BudgetExceeded {
                scope: "all tools per run".to_string(),
                limit: 3
            }
        );
        assert_eq!(budget.calls_made(), 3);
        assert_eq!(counters.total("t1"), 3);
    }

    #[test]
    fn test_per_tool_limit() {
        let counters = Arc::new(ThreadCallCounters::new());
        let mut budget = ToolCallBudget::new(small_config(), "t1", counters);

        assert!(budget.try_consume("execute_tool").is_ok());
        let err = budget.try_consume("execute_tool").unwrap_err();
        assert!(err.to_string().contains("execute_tool per run allows at most 1"));
        assert!(budget.try_consume("think").is_ok());
    }

    #[test]
    fn test_thread_counts_survive_new_run() {
        let counters = Arc::new(ThreadCallCounters::new());
        let config = AgentBudgetConfig {
            total: ToolCallLimit::new(4, 3),
            per_tool: BTreeMap::new(),
            max_model_turns: 5,
        };

        let mut first = ToolCallBudget::new(config.clone(), "t1", counters.clone());
        for _ in 0..3 {
            first.try_consume("think").unwrap();
        }

        let mut second = ToolCallBudget::new(config.clone(), "t1", counters.clone());
        assert!(second.try_consume("think").is_ok());
        let err = second.try_consume("think").unwrap_err();
        assert!(err.to_string().contains("per thread"));

        let mut other_thread = ToolCallBudget::new(config, "t2", counters);
        assert!(other_thread.try_consume("think").is_ok());
    }

    #[test]
    fn test_clear_thread_releases_only_that_thread() {
        let counters = Arc::new(ThreadCallCounters::new());
        let mut first = ToolCallBudget::new(small_config(), "t1", counters.clone());
        first.try_consume("execute_tool").unwrap();
        let mut other = ToolCallBudget::new(small_config(), "t2", counters.clone());
        other.try_consume("think").unwrap();

        counters.clear_thread("t1");
        assert_eq!(counters.total("t1"), 0);
        assert_eq!(counters.get("t1", "execute_tool"), 0);
        assert_eq!(counters.total("t2"), 1);
    }

    #[test]
    fn test_defaults_match_reference_configuration() {
        let limits = AgentLimits::default();
        assert_eq!(limits.supervisor.total, ToolCallLimit::new(30, 10));
        assert_eq!(limits.supervisor.per_tool["spawn_worker"], ToolCallLimit::new(10, 4));
        assert_eq!(limits.worker.total, ToolCallLimit::new(40, 16));
        assert_eq!(limits.worker.per_tool["search_tools"], ToolCallLimit::new(10, 6));
        assert_eq!(limits.worker.per_tool["execute_tool"], ToolCallLimit::new(20, 10));
        assert_eq!(limits.max_supervisor_iterations, 10);
    }

    #[test]
    fn test_limits_from_ron_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(
                supervisor: (total: (thread: 8, run: 4)),
                worker: (
                    total: (thread: 12, run: 6),
                    per_tool: {{"execute_tool": (thread: 3, run: 2)}},
                    max_model_turns: 9,
                ),
            )"#
        )
        .unwrap();

        let limits = AgentLimits::from_file(file.path()).unwrap();
        assert_eq!(limits.supervisor.total, ToolCallLimit::new(8, 4));
        assert!(limits.supervisor.per_tool.is_empty());
        assert_eq!(limits.supervisor.max_model_turns, 25);
        assert_eq!(limits.worker.per_tool["execute_tool"].run, 2);
        assert_eq!(limits.worker.max_model_turns, 9);
        assert_eq!(limits.max_supervisor_iterations, 10);
    }

    #[test]
    fn test_bad_ron_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(supervisor: oops)").unwrap();
        assert!(AgentLimits::from_file(file.path()).is_err());
    }
}
