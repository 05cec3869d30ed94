use crate::catalog::{ParamType, ToolParameter};
use serde_json::{Map, Value};

/// Outcome of checking arguments against a tool's parameter list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Required parameters that are absent or null
    pub missing: Vec<String>,
    /// Required string/array/object parameters that are blank
    pub empty: Vec<String>,
    /// Required parameters whose value is of the wrong type family
    pub mismatched: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.empty.is_empty() && self.mismatched.is_empty()
    }

    /// Human-readable problems, one per line
    pub fn to_message(&self) -> String {
        let mut lines = Vec::new();
        if !self.missing.is_empty() {
            lines.push(format!("Missing required params: {}", self.missing.join(", ")));
        }
        if !self.empty.is_empty() {
            lines.push(format!("Empty required params: {}", self.empty.join(", ")));
        }
        if !self.mismatched.is_empty() {
            lines.push(format!("Wrong parameter types: {}", self.mismatched.join(", ")));
        }
        lines.join("\n")
    }
}

fn is_blank(param_type: ParamType, value: &Value) -> bool {
    match (param_type, value) {
        (ParamType::String, Value::String(s)) => s.trim().is_empty(),
        (ParamType::Array, Value::Array(items)) => items.is_empty(),
        (ParamType::Object, Value::Object(map)) => map.is_empty(),
        // numeric and boolean values only need to be present
        _ => false,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check every required parameter for presence, non-emptiness and type family.
/// Optional parameters are left for the broker to judge.
pub fn validate_arguments(parameters: &[ToolParameter], args: &Map<String, Value>) -> ValidationReport {
    let mut report = ValidationReport::default();

    for param in parameters.iter().filter(|p| p.required) {
        match args.get(&param.name) {
            None | Some(Value::Null) => report.missing.push(param.name.clone()),
            Some(value) if !param.param_type.matches(value) => report.mismatched.push(format!(
                "{} (expected {}, got {})",
                param.name,
                param.param_type,
                describe(value)
            )),
            Some(value) if is_blank(param.param_type, value) => report.empty.push(param.name.clone()),
            Some(_) => {}
        }
    }

    report
}
