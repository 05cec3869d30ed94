//! Write todos tool - replaces the supervisor's todo list
//!
//! The supervisor loop intercepts the metadata and replaces its list.

use crate::agents::todos::{assign_ids, TodoItem};
use crate::tools::registry::Tool;
use crate::tools::types::{PropertySchema, ToolContext, ToolGroup, ToolInputSchema, ToolResult, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

pub struct WriteTodosTool {
    definition: ToolSpec,
}

impl WriteTodosTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "todos".to_string(),
            PropertySchema::string_array(
                "The complete todo list. Group by service: one todo holds all the work for one integration, e.g. \"GitHub: find the latest merged PR in acme/api and extract title, URL, author\".",
                "One domain-scoped todo",
            ),
        );

        WriteTodosTool {
            definition: ToolSpec {
                name: "write_todos".to_string(),
                description: "Replace the entire todo list. Group todos by service/domain, not by micro-step. An empty list means nothing is left to do.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["todos".to_string()],
                },
                group: ToolGroup::Planning,
            },
        }
    }
}

impl Default for WriteTodosTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Accepts plain strings or `{"id": .., "text": ..}` objects
fn parse_entry(value: &Value) -> Option<(Option<String>, String)> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some((None, s.trim().to_string())),
        Value::Object(obj) => {
            let text = obj.get("text").and_then(|v| v.as_str())?.trim();
            if text.is_empty() {
                return None;
            }
            let id = obj.get("id").and_then(|v| v.as_str()).map(str::to_string);
            Some((id, text.to_string()))
        }
        _ => None,
    }
}

#[async_trait]
impl Tool for WriteTodosTool {
    fn definition(&self) -> ToolSpec {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> ToolResult {
        let entries = match params.get("todos").and_then(|v| v.as_array()) {
            Some(arr) => arr,
            None => return ToolResult::error("Missing or invalid 'todos' parameter. Must be an array of strings."),
        };

        let todos: Vec<TodoItem> = assign_ids(entries.iter().filter_map(parse_entry).collect());
        if todos.len() < entries.len() {
            log::warn!(
                "[SUPERVISOR] Dropped {} empty or malformed todo entries",
                entries.len() - todos.len()
            );
        }

        let listing = if todos.is_empty() {
            "(empty)".to_string()
        } else {
            todos
                .iter()
                .enumerate()
                .map(|(i, t)| format!("{}. [{}] {}", i + 1, t.id, t.text))
                .collect::<Vec<_>>()
                .join("\n")
        };

        ToolResult::success(format!("✅ Todos updated ({}):\n{}", todos.len(), listing)).with_metadata(json!({
            "write_todos": true,
            "todos": todos
        }))
    }
}
