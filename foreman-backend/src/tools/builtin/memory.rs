//! Artifact memory tools for passing large payloads between agents.

use crate::artifacts::{generate_artifact_key, ArtifactStore, ARTIFACT_NAMESPACE};
use crate::tools::registry::Tool;
use crate::tools::types::{PropertySchema, ToolContext, ToolGroup, ToolInputSchema, ToolResult, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct WriteMemoryTool {
    definition: ToolSpec,
    store: Arc<dyn ArtifactStore>,
}

impl WriteMemoryTool {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "key".to_string(),
            PropertySchema::new("string", "Key to store under; use \"auto\" to generate one"),
        );
        properties.insert(
            "content".to_string(),
            PropertySchema::new("string", "The data to store"),
        );

        WriteMemoryTool {
            definition: ToolSpec {
                name: "write_memory".to_string(),
                description: "Save a large payload to shared memory and get back its key. Pass the key to spawn_worker via artifact_keys instead of pasting the data into instructions.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["content".to_string()],
                },
                group: ToolGroup::Memory,
            },
            store,
        }
    }
}

#[async_trait]
impl Tool for WriteMemoryTool {
    fn definition(&self) -> ToolSpec {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> ToolResult {
        let content = match params.get("content").and_then(|v| v.as_str()) {
            Some(c) => c,
            None => return ToolResult::error("Missing 'content' parameter"),
        };
        let key = match params.get("key").and_then(|v| v.as_str()).map(str::trim) {
            Some(k) if !k.is_empty() && k != "auto" => k.to_string(),
            _ => generate_artifact_key(),
        };

        match self
            .store
            .put(ARTIFACT_NAMESPACE, &key, Value::String(content.to_string()))
            .await
        {
            Ok(()) => {
                log::info!("[MEMORY] Saved artifact {} ({} chars)", key, content.len());
                ToolResult::success(format!("Saved to memory key: {}", key)).with_metadata(json!({ "key": key }))
            }
            Err(e) => ToolResult::error(format!("Error writing memory: {}", e)),
        }
    }
}

pub struct ReadMemoryTool {
    definition: ToolSpec,
    store: Arc<dyn ArtifactStore>,
}

impl ReadMemoryTool {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        let mut properties = HashMap::new();
        properties.insert("key".to_string(), PropertySchema::new("string", "Key returned by write_memory"));

        ReadMemoryTool {
            definition: ToolSpec {
                name: "read_memory".to_string(),
                description: "Read a payload previously saved with write_memory.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["key".to_string()],
                },
                group: ToolGroup::Memory,
            },
            store,
        }
    }
}

/// Stored strings are returned verbatim, anything else as JSON
pub fn artifact_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Tool for ReadMemoryTool {
    fn definition(&self) -> ToolSpec {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> ToolResult {
        let key = match params.get("key").and_then(|v| v.as_str()) {
            Some(k) if !k.trim().is_empty() => k.trim(),
            _ => return ToolResult::error("Missing 'key' parameter"),
        };

        match self.store.get(ARTIFACT_NAMESPACE, key).await {
            Ok(Some(record)) => ToolResult::success(artifact_text(&record.value)),
            Ok(None) => ToolResult::error(format!("Error: No memory found for key '{}'", key)),
            Err(e) => ToolResult::error(format!("Error reading memory: {}", e)),
        }
    }
}
