//! Turning scratchpad text into a structured execution plan.

use crate::ai::{ChatModel, Message};
use crate::catalog::{ParamType, ToolDefinition};
use crate::planning::store::ExecutionPlan;
use crate::tools::{PropertySchema, ToolGroup, ToolInputSchema, ToolSpec};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Everything a deriver may look at
pub struct DerivationRequest<'a> {
    pub scratchpad: &'a str,
    /// Tool named in the scratchpad, when one was recognized
    pub tool_name: Option<&'a str>,
    /// Cached schema for `tool_name`
    pub schema: Option<&'a ToolDefinition>,
    /// Pre-provisioned identifiers the plan may rely on
    pub secrets: &'a BTreeMap<String, String>,
}

#[async_trait]
pub trait PlanDeriver: Send + Sync {
    /// `None` when no plan can be read out of the text
    async fn derive(&self, request: DerivationRequest<'_>) -> Option<ExecutionPlan>;
}

static TOOL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9]*(?:_[A-Z0-9]+)+$").expect("valid tool token pattern"));

/// Reads `name='value'`, `name="value"`, `` name=`value` `` or `name: value`
/// assignments for each schema parameter straight from the text.
#[derive(Default)]
pub struct LexicalPlanDeriver;

impl LexicalPlanDeriver {
    pub fn new() -> Self {
        LexicalPlanDeriver
    }

    fn assignment_pattern(param: &str) -> Option<Regex> {
        let source = format!(
            r#"(?i)\b{}\s*[=:]\s*(?:'([^']*)'|"([^"]*)"|`([^`]*)`|([^\s,;)]+))"#,
            regex::escape(param)
        );
        Regex::new(&source).ok()
    }

    /// Last assignment wins; a value that is itself a tool name is prose
    /// such as "Tool name: ASANA_CREATE_TASK", not a parameter.
    fn find_assignment(text: &str, param: &str) -> Option<String> {
        Self::assignment_pattern(param)?
            .captures_iter(text)
            .filter_map(|caps| (1..=4).find_map(|i| caps.get(i)))
            .map(|m| m.as_str().to_string())
            .filter(|value| !TOOL_TOKEN.is_match(value.trim_end_matches(|c: char| c.is_ascii_punctuation())))
            .last()
    }
}

/// Coerce a raw textual value into the parameter's type family. Values that
/// do not parse are kept as strings so validation can report them.
pub fn coerce_value(raw: &str, param_type: ParamType) -> Value {
    let trimmed = raw.trim();
    match param_type {
        ParamType::String => Value::String(raw.to_string()),
        ParamType::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        ParamType::Number => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        ParamType::Boolean => match trimmed.to_lowercase().as_str() {
            "true" | "yes" => Value::Bool(true),
            "false" | "no" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        ParamType::Array => match serde_json::from_str::<Value>(trimmed) {
            Ok(v @ Value::Array(_)) => v,
            _ if trimmed.is_empty() => Value::Array(vec![]),
            _ => Value::Array(
                trimmed
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
        },
        ParamType::Object => match serde_json::from_str::<Value>(trimmed) {
            Ok(v @ Value::Object(_)) => v,
            _ => Value::String(raw.to_string()),
        },
    }
}

#[async_trait]
impl PlanDeriver for LexicalPlanDeriver {
    async fn derive(&self, request: DerivationRequest<'_>) -> Option<ExecutionPlan> {
        let schema = request.schema?;
        let tool_name = request.tool_name.unwrap_or(schema.name.as_str());

        let mut params = Map::new();
        for param in &schema.parameters {
            if let Some(raw) = Self::find_assignment(request.scratchpad, &param.name) {
                params.insert(param.name.clone(), coerce_value(&raw, param.param_type));
            }
        }

        Some(ExecutionPlan::new(tool_name, request.scratchpad.trim(), params))
    }
}

const RECORD_PLAN_TOOL: &str = "record_execution_plan";

/// Asks a (temperature 0) model to fill a `record_execution_plan` call.
pub struct LlmPlanDeriver {
    model: Arc<dyn ChatModel>,
}

impl LlmPlanDeriver {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        LlmPlanDeriver { model }
    }

    fn record_plan_spec() -> ToolSpec {
        let mut properties = HashMap::new();
        properties.insert(
            "tool_name".to_string(),
            PropertySchema::new("string", "Exact name of the tool the agent intends to execute"),
        );
        properties.insert(
            "reasoning".to_string(),
            PropertySchema::new("string", "One sentence on why this tool and these parameters"),
        );
        properties.insert(
            "params".to_string(),
            PropertySchema::new("object", "Parameter values, keyed by parameter name"),
        );
        ToolSpec {
            name: RECORD_PLAN_TOOL.to_string(),
            description: "Record the tool call the agent has decided to make.".to_string(),
            input_schema: ToolInputSchema {
                schema_type: "object".to_string(),
                properties,
                required: vec!["tool_name".to_string(), "reasoning".to_string(), "params".to_string()],
            },
            group: ToolGroup::Reasoning,
        }
    }

    fn system_prompt(request: &DerivationRequest<'_>) -> String {
        let mut prompt = String::from(
            "You extract execution plans from an agent's reasoning.\n\
             Return the tool the agent decided to call and the exact parameter values it stated.\n\
             Use the schema parameter names. Do not invent values the reasoning does not give, \
             except identifiers listed under Available identifiers.\n",
        );
        if let Some(schema) = request.schema {
            prompt.push_str(&format!(
                "\n## Tool schema: {}\n{}\n",
                schema.name,
                schema.schema_summary()
            ));
        }
        if !request.secrets.is_empty() {
            prompt.push_str("\n## Available identifiers\n");
            for (key, value) in request.secrets {
                prompt.push_str(&format!("- {}: {}\n", key, value));
            }
        }
        prompt
    }
}

#[async_trait]
impl PlanDeriver for LlmPlanDeriver {
    async fn derive(&self, request: DerivationRequest<'_>) -> Option<ExecutionPlan> {
        let messages = vec![
            Message::system(Self::system_prompt(&request)),
            Message::user(request.scratchpad.to_string()),
        ];

        let response = match self
            .model
            .generate_forced_tool(messages, Self::record_plan_spec())
            .await
        {
            Ok(r) => r,
            Err(e) => {
                log::warn!("[PLAN] Plan extraction model call failed: {}", e);
                return None;
            }
        };

        let call = response
            .tool_calls
            .into_iter()
            .find(|c| c.name == RECORD_PLAN_TOOL)?;
        let plan: ExecutionPlan = match serde_json::from_value(call.arguments) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("[PLAN] Extractor returned a malformed plan: {}", e);
                return None;
            }
        };
        if plan.tool_name.trim().is_empty() {
            return None;
        }
        Some(plan)
    }
}
