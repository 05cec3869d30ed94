//! Namespaced key/value store for handing data from one worker to the next.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

/// Namespace used by the memory tools
pub const ARTIFACT_NAMESPACE: &str = "artifacts";

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRecord {
    pub value: Value,
    pub stored_at: DateTime<Utc>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<(), String>;

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<ArtifactRecord>, String>;
}

/// Process-local artifact store
#[derive(Default)]
pub struct InMemoryArtifactStore {
    records: DashMap<(String, String), ArtifactRecord>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<(), String> {
        self.records.insert(
            (namespace.to_string(), key.to_string()),
            ArtifactRecord {
                value,
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<ArtifactRecord>, String> {
        Ok(self
            .records
            .get(&(namespace.to_string(), key.to_string()))
            .map(|r| r.value().clone()))
    }
}

/// Short random key for `key: "auto"` writes
pub fn generate_artifact_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
