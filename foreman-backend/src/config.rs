use serde_json::{json, Value};
use std::env;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};

/// Variables that must be present for the service to start, with a short
/// description used in the startup error.
const REQUIRED_VARS: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "OpenAI API key for LLM calls"),
    ("COMPOSIO_API_KEY", "Composio API key for tool integration"),
    ("COMPOSIO_USER_ID", "Composio user ID for tool integration"),
];

const OPTIONAL_VARS: &[&str] = &[
    "OPENAI_MODEL",
    "OPENAI_ENDPOINT",
    "EXTRACTOR_MODEL",
    "TOOL_HUB_URL",
    "TOOL_HUB_API_KEY",
    "COMPOSIO_BASE_URL",
    "KNOWN_INTEGRATIONS",
    "PLAN_EXTRACTION",
    "PLAN_TTL_SECS",
    "SCHEMA_CACHE_CAPACITY",
    "SEARCH_TOP_K",
];

pub const DEFAULT_INTEGRATIONS: &[&str] = &[
    "github",
    "asana",
    "slack",
    "gmail",
    "googledrive",
    "googlecalendar",
    "googlesheets",
];

/// How the `think` tool turns free-text reasoning into a structured plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PlanExtractionMode {
    /// Parse `param='value'` assignments straight out of the scratchpad
    #[default]
    Lexical,
    /// Ask the extractor model for a structured plan
    Llm,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_endpoint: Option<String>,
    pub extractor_model: String,
    pub composio_api_key: String,
    pub composio_user_id: String,
    pub composio_base_url: Option<String>,
    pub tool_hub_url: Option<String>,
    pub tool_hub_api_key: Option<String>,
    pub known_integrations: Vec<String>,
    pub plan_extraction: PlanExtractionMode,
    pub plan_ttl_secs: u64,
    pub schema_cache_capacity: Option<u64>,
    /// Tools returned per discovery call; unset keeps the built-in default
    pub search_top_k: Option<usize>,
}

impl Config {
    /// Load from the process environment (call `dotenv()` first).
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    ///
    /// Every missing required variable is reported in a single error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|(name, _)| get(name).is_none())
            .map(|(name, description)| format!("  - {} ({})", name, description))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "Missing required environment variables:\n{}\n\nPlease set these in your environment or .env file.",
                missing.join("\n")
            ));
        }

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("PORT must be a valid number, got '{}'", raw))?,
            None => 8000,
        };
        let plan_ttl_secs = match get("PLAN_TTL_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("PLAN_TTL_SECS must be a number of seconds, got '{}'", raw))?,
            None => 600,
        };
        let schema_cache_capacity = match get("SCHEMA_CACHE_CAPACITY") {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| format!("SCHEMA_CACHE_CAPACITY must be a number, got '{}'", raw))?,
            ),
            None => None,
        };
        let search_top_k = match get("SEARCH_TOP_K") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => return Err(format!("SEARCH_TOP_K must be a positive number, got '{}'", raw)),
            },
            None => None,
        };
        let plan_extraction = match get("PLAN_EXTRACTION") {
            Some(raw) => PlanExtractionMode::from_str(raw.trim())
                .map_err(|_| format!("PLAN_EXTRACTION must be 'lexical' or 'llm', got '{}'", raw))?,
            None => PlanExtractionMode::default(),
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            openai_api_key: get("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-5-mini".to_string()),
            openai_endpoint: get("OPENAI_ENDPOINT"),
            extractor_model: get("EXTRACTOR_MODEL").unwrap_or_else(|| "gpt-5-mini".to_string()),
            composio_api_key: get("COMPOSIO_API_KEY").unwrap_or_default(),
            composio_user_id: get("COMPOSIO_USER_ID").unwrap_or_default(),
            composio_base_url: get("COMPOSIO_BASE_URL"),
            tool_hub_url: get("TOOL_HUB_URL"),
            tool_hub_api_key: get("TOOL_HUB_API_KEY"),
            known_integrations: get("KNOWN_INTEGRATIONS")
                .map(|raw| parse_integration_list(&raw))
                .unwrap_or_else(|| DEFAULT_INTEGRATIONS.iter().map(|s| s.to_string()).collect()),
            plan_extraction,
            plan_ttl_secs,
            schema_cache_capacity,
            search_top_k,
        })
    }

    /// Presence of every known variable, for the health endpoint.
    pub fn env_summary() -> Value {
        let required: serde_json::Map<String, Value> = REQUIRED_VARS
            .iter()
            .map(|(name, _)| (name.to_string(), Value::Bool(env::var(name).is_ok())))
            .collect();
        let optional: serde_json::Map<String, Value> = OPTIONAL_VARS
            .iter()
            .map(|name| (name.to_string(), Value::Bool(env::var(name).is_ok())))
            .collect();
        json!({ "required": required, "optional": optional })
    }
}

/// Comma-separated integration names, lowercased and deduplicated.
pub fn parse_integration_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(|s| s.trim().to_lowercase()) {
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("OPENAI_API_KEY", "sk-test"),
        ("COMPOSIO_API_KEY", "cmp-test"),
        ("COMPOSIO_USER_ID", "user-1"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.plan_ttl_secs, 600);
        assert_eq!(config.plan_extraction, PlanExtractionMode::Lexical);
        assert!(config.known_integrations.contains(&"github".to_string()));
        assert!(config.tool_hub_url.is_none());
        assert!(config.search_top_k.is_none());
    }

    #[test]
    fn test_all_missing_vars_reported_at_once() {
        let err = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk")])).unwrap_err();
        assert!(err.contains("COMPOSIO_API_KEY"));
        assert!(err.contains("COMPOSIO_USER_ID"));
        assert!(!err.contains("OPENAI_API_KEY ("));
    }

    #[test]
    fn test_blank_required_var_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("OPENAI_API_KEY", "   ");
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_overrides_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "9100"));
        pairs.push(("PLAN_EXTRACTION", "LLM"));
        pairs.push(("KNOWN_INTEGRATIONS", "GitHub, asana,github,,notion"));
        pairs.push(("SCHEMA_CACHE_CAPACITY", "256"));
        pairs.push(("SEARCH_TOP_K", "8"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.search_top_k, Some(8));
        assert_eq!(config.port, 9100);
        assert_eq!(config.plan_extraction, PlanExtractionMode::Llm);
        assert_eq!(config.known_integrations, vec!["github", "asana", "notion"]);
        assert_eq!(config.schema_cache_capacity, Some(256));
    }

    #[test]
    fn test_zero_search_top_k_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SEARCH_TOP_K", "0"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
