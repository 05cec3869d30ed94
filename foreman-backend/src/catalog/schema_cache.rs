//! Process-wide cache of tool parameter schemas.
//!
//! Populated by discovery and by execution-time broker fetches, read by the
//! plan extractor and the execution gateway.

use std::sync::Arc;

use moka::sync::Cache;

use super::ToolDefinition;

pub struct ToolSchemaCache {
    schemas: Cache<String, Arc<ToolDefinition>>,
}

impl ToolSchemaCache {
    /// Entries live for the process lifetime unless `max_capacity` forces
    /// eviction.
    pub fn new(max_capacity: Option<u64>) -> Self {
        let mut builder = Cache::<String, Arc<ToolDefinition>>::builder();
        if let Some(capacity) = max_capacity {
            builder = builder.max_capacity(capacity);
        }
        Self {
            schemas: builder.build(),
        }
    }

    /// Insert or overwrite the schema for `definition.name`
    pub fn insert(&self, definition: ToolDefinition) {
        self.schemas
            .insert(definition.name.clone(), Arc::new(definition));
    }

    pub fn get(&self, tool_name: &str) -> Option<Arc<ToolDefinition>> {
        self.schemas.get(tool_name)
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.schemas.contains_key(tool_name)
    }
}

impl Default for ToolSchemaCache {
    fn default() -> Self {
        Self::new(None)
    }
}
