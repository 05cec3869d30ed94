//! Tool discovery: semantic search, then schema enrichment from the broker.

use crate::catalog::{ToolDefinition, ToolSchemaCache};
use crate::integrations::{IntegrationBroker, SearchHit, ToolSearch};
use futures_util::future::join_all;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 3;

pub struct ToolDiscovery {
    search: Arc<dyn ToolSearch>,
    broker: Arc<dyn IntegrationBroker>,
    schema_cache: Arc<ToolSchemaCache>,
}

impl ToolDiscovery {
    pub fn new(
        search: Arc<dyn ToolSearch>,
        broker: Arc<dyn IntegrationBroker>,
        schema_cache: Arc<ToolSchemaCache>,
    ) -> Self {
        ToolDiscovery {
            search,
            broker,
            schema_cache,
        }
    }

    /// Find up to `top_k` tools for `query`, optionally restricted to some
    /// integration domains. Every returned definition is also cached.
    ///
    /// Search or broker failures degrade to fewer (or zero) results.
    pub async fn discover(
        &self,
        query: &str,
        domains: Option<&[String]>,
        top_k: usize,
        user_id: &str,
    ) -> Vec<ToolDefinition> {
        let query = query.trim();
        if query.is_empty() || top_k == 0 {
            return vec![];
        }

        let domains: Vec<String> = domains
            .unwrap_or(&[])
            .iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        let hits = if domains.is_empty() {
            self.search_one(query, None, top_k).await
        } else {
            let searches = domains
                .iter()
                .map(|domain| self.search_one(query, Some(domain.as_str()), top_k));
            join_all(searches).await.into_iter().flatten().collect()
        };

        let hits = rank_hits(hits, top_k);
        log::info!(
            "[DISCOVERY] '{}' (domains: {:?}) -> {:?}",
            query,
            domains,
            hits.iter().map(|h| h.name.as_str()).collect::<Vec<_>>()
        );
        if hits.is_empty() {
            return vec![];
        }

        let names: Vec<String> = hits.iter().map(|h| h.name.clone()).collect();
        let mut schemas: HashMap<String, ToolDefinition> = match self.broker.get_schemas(user_id, &names).await {
            Ok(defs) => defs.into_iter().map(|d| (d.name.clone(), d)).collect(),
            Err(e) => {
                log::warn!("[DISCOVERY] Schema fetch failed, using index parameters: {}", e);
                HashMap::new()
            }
        };

        hits.into_iter()
            .map(|hit| {
                let broker_def = schemas.remove(&hit.name);
                let description = if hit.description.is_empty() {
                    broker_def.as_ref().map(|d| d.description.clone()).unwrap_or_default()
                } else {
                    hit.description
                };
                let parameters = match broker_def {
                    Some(def) => def.parameters,
                    None => hit.parameters.unwrap_or_default(),
                };
                let definition = ToolDefinition::new(hit.name, &description, parameters);
                self.schema_cache.insert(definition.clone());
                definition
            })
            .collect()
    }

    async fn search_one(&self, query: &str, domain: Option<&str>, top_k: usize) -> Vec<SearchHit> {
        match self.search.query(query, domain, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                log::warn!("[DISCOVERY] Search failed (domain {:?}): {}", domain, e);
                vec![]
            }
        }
    }
}

/// Highest score first, one entry per tool name, at most `top_k`
fn rank_hits(mut hits: Vec<SearchHit>, top_k: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let mut seen = HashSet::new();
    hits.retain(|h| seen.insert(h.name.clone()));
    hits.truncate(top_k);
    hits
}
