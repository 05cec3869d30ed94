//! Client for the semantic tool index service.

use crate::catalog::{parameters_from_json_schema, ToolParameter};
use crate::integrations::{SearchHit, ToolSearch};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::{json, Value};

pub struct ToolHubClient {
    client: Client,
    headers: header::HeaderMap,
    endpoint: String,
}

impl ToolHubClient {
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self, String> {
        Ok(ToolHubClient {
            client: crate::http::shared_client().clone(),
            headers: crate::http::json_headers("x-api-key", api_key.unwrap_or(""))?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

/// Index entries carry parameters either as a list or as a JSON schema
fn parse_hit_parameters(value: &Value) -> Option<Vec<ToolParameter>> {
    match value {
        Value::Array(_) => serde_json::from_value(value.clone()).ok(),
        Value::Object(map) if map.contains_key("properties") => Some(parameters_from_json_schema(value)),
        _ => None,
    }
}

pub fn parse_search_results(value: &Value) -> Vec<SearchHit> {
    let results = value
        .get("results")
        .or_else(|| value.get("tools"))
        .and_then(Value::as_array)
        .or_else(|| value.as_array());
    results
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = item.get("name").and_then(Value::as_str)?;
                    Some(SearchHit {
                        name: name.to_string(),
                        description: item
                            .get("description")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string(),
                        score: item.get("score").and_then(Value::as_f64).unwrap_or(0.0),
                        parameters: item.get("parameters").and_then(parse_hit_parameters),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ToolSearch for ToolHubClient {
    async fn query(&self, text: &str, integration: Option<&str>, top_k: usize) -> Result<Vec<SearchHit>, String> {
        let mut body = json!({ "query": text, "top_k": top_k });
        if let Some(integration) = integration {
            body["integration"] = json!(integration);
        }
        log::debug!("[TOOLHUB] Query {:?} (integration: {:?})", text, integration);

        let response = self
            .client
            .post(format!("{}/query", self.endpoint))
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Tool index request failed: {}", e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Tool index returned {}: {}", status, text));
        }
        let value: Value = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse tool index response: {}", e))?;
        Ok(parse_search_results(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ParamType;

    #[test]
    fn test_parse_results_with_both_parameter_shapes() {
        let hits = parse_search_results(&json!({
            "results": [
                {
                    "name": "GITHUB_LIST_PULL_REQUESTS",
                    "description": "List PRs",
                    "score": 0.91,
                    "parameters": {"properties": {"owner": {"type": "string"}}, "required": ["owner"]}
                },
                {
                    "name": "GITHUB_GET_REPO",
                    "score": 0.5,
                    "parameters": [{"name": "repo", "type": "string", "required": true}]
                },
                {"description": "nameless entries are dropped"}
            ]
        }));

        assert_eq!(hits.len(), 2);
        let first = hits[0].parameters.as_ref().unwrap();
        assert!(first[0].required);
        assert_eq!(hits[1].parameters.as_ref().unwrap()[0].param_type, ParamType::String);
        assert_eq!(hits[1].description, "");
    }

    #[test]
    fn test_parse_bare_array() {
        let hits = parse_search_results(&json!([{"name": "SLACK_POST", "score": 0.3}]));
        assert_eq!(hits[0].name, "SLACK_POST");
        assert!(hits[0].parameters.is_none());
    }
}
