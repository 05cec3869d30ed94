//! Broker tool catalog: parameter schemas and the process-wide schema cache.

pub mod schema_cache;

pub use schema_cache::ToolSchemaCache;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

/// Descriptions longer than this are cut before they reach an agent prompt
pub const DESCRIPTION_BUDGET: usize = 300;

/// JSON-schema type family of a tool parameter
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Read a JSON-schema `type`, which may be a string or a list of
    /// alternatives. Lists use their first non-null entry; unknown types
    /// degrade to `String`.
    pub fn from_schema_type(raw: &Value) -> Self {
        let name = match raw {
            Value::String(s) => Some(s.as_str()),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .find(|s| *s != "null"),
            _ => None,
        };
        name.and_then(|n| n.parse().ok()).unwrap_or_default()
    }

    /// Whether `value` belongs to this type family
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
            }
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ToolParameter {
    pub fn new(name: &str, param_type: ParamType, required: bool) -> Self {
        ToolParameter {
            name: name.to_string(),
            param_type,
            description: String::new(),
            required,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// A broker tool as agents see it: name, short description, parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: &str, parameters: Vec<ToolParameter>) -> Self {
        ToolDefinition {
            name: name.into(),
            description: truncate_description(description),
            parameters,
        }
    }

    /// Build from a JSON schema object (`properties` + `required`).
    pub fn from_json_schema(name: impl Into<String>, description: &str, schema: &Value) -> Self {
        ToolDefinition::new(name, description, parameters_from_json_schema(schema))
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Integration domain, taken from the tool name prefix (`GITHUB_...` -> `github`)
    pub fn domain(&self) -> Option<String> {
        tool_domain(&self.name)
    }

    /// One line per parameter, for prompts and validation errors
    pub fn schema_summary(&self) -> String {
        if self.parameters.is_empty() {
            return "  (no parameters)".to_string();
        }
        self.parameters
            .iter()
            .map(|p| {
                let flag = if p.required { "required" } else { "optional" };
                if p.description.is_empty() {
                    format!("  - {}: {} ({})", p.name, p.param_type, flag)
                } else {
                    format!("  - {}: {} ({}) - {}", p.name, p.param_type, flag, p.description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parameters from a JSON schema's `properties`, required ones first.
pub fn parameters_from_json_schema(schema: &Value) -> Vec<ToolParameter> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut parameters: Vec<ToolParameter> = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| ToolParameter {
                    name: name.clone(),
                    param_type: prop
                        .get("type")
                        .map(ParamType::from_schema_type)
                        .unwrap_or_default(),
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .map(truncate_description)
                        .unwrap_or_default(),
                    required: required.contains(&name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default();

    parameters.sort_by_key(|p| !p.required);
    parameters
}

/// Cut a description to the prompt budget on a char boundary
pub fn truncate_description(description: &str) -> String {
    description.chars().take(DESCRIPTION_BUDGET).collect()
}

/// Lowercased prefix before the first underscore, if any
pub fn tool_domain(tool_name: &str) -> Option<String> {
    tool_name
        .split_once('_')
        .map(|(prefix, _)| prefix.to_lowercase())
        .filter(|prefix| !prefix.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_type_from_schema_type() {
        assert_eq!(ParamType::from_schema_type(&json!("integer")), ParamType::Integer);
        assert_eq!(ParamType::from_schema_type(&json!(["null", "boolean"])), ParamType::Boolean);
        assert_eq!(ParamType::from_schema_type(&json!(["array", "string"])), ParamType::Array);
        assert_eq!(ParamType::from_schema_type(&json!("mystery")), ParamType::String);
        assert_eq!(ParamType::from_schema_type(&Value::Null), ParamType::String);
    }

    #[test]
    fn test_param_type_matches() {
        assert!(ParamType::Integer.matches(&json!(5)));
        assert!(ParamType::Integer.matches(&json!(5.0)));
        assert!(!ParamType::Integer.matches(&json!(5.5)));
        assert!(!ParamType::Integer.matches(&json!("5")));
        assert!(ParamType::Number.matches(&json!(5.5)));
        assert!(ParamType::Object.matches(&json!({})));
        assert!(!ParamType::String.matches(&json!(null)));
    }

    #[test]
    fn test_from_json_schema_marks_required_first() {
        let schema = json!({
            "type": "object",
            "properties": {
                "state": {"type": "string", "description": "open or closed"},
                "owner": {"type": "string"},
                "repo": {"type": "string"},
                "per_page": {"type": ["integer", "null"]}
            },
            "required": ["owner", "repo"]
        });
        let def = ToolDefinition::from_json_schema("GITHUB_LIST_PULL_REQUESTS", "List PRs", &schema);

        assert_eq!(def.parameters.len(), 4);
        assert!(def.parameters[0].required && def.parameters[1].required);
        assert_eq!(def.required_parameters().count(), 2);
        assert_eq!(def.parameter("per_page").unwrap().param_type, ParamType::Integer);
        assert_eq!(def.domain().as_deref(), Some("github"));
    }

    #[test]
    fn test_description_truncated_on_char_boundary() {
        let long = "é".repeat(DESCRIPTION_BUDGET + 50);
        let def = ToolDefinition::new("SLACK_POST", &long, vec![]);
        assert_eq!(def.description.chars().count(), DESCRIPTION_BUDGET);
    }

    #[test]
    fn test_tool_domain() {
        assert_eq!(tool_domain("ASANA_CREATE_TASK").as_deref(), Some("asana"));
        assert_eq!(tool_domain("think"), None);
        assert_eq!(tool_domain("_LEADING"), None);
    }

    #[test]
    fn test_schema_summary_lists_every_parameter() {
        let def = ToolDefinition::new(
            "GITHUB_GET_REPO",
            "Get a repository",
            vec![
                ToolParameter::new("owner", ParamType::String, true).with_description("Org or user"),
                ToolParameter::new("repo", ParamType::String, true),
            ],
        );
        let summary = def.schema_summary();
        assert!(summary.contains("owner: string (required) - Org or user"));
        assert!(summary.contains("repo: string (required)"));
    }

    #[test]
    fn test_tool_parameter_deserializes_with_defaults() {
        let param: ToolParameter = serde_json::from_value(json!({"name": "q"})).unwrap();
        assert_eq!(param.param_type, ParamType::String);
        assert!(!param.required);
    }
}
