use crate::catalog::{tool_domain, ToolDefinition, ToolSchemaCache};
use crate::context::UserContextStore;
use crate::planning::derive::{DerivationRequest, PlanDeriver};
use crate::planning::intent::IntentClassifier;
use crate::planning::store::{ExecutionPlan, PlanStore};
use crate::planning::validation::validate_arguments;
use crate::secrets::{resolve_identifier, SecretsStore};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs on every `think` call: detect intent, derive a plan, fill
/// pre-provisioned identifiers, validate, and commit it to the plan store.
pub struct PlanExtractor {
    classifier: Arc<dyn IntentClassifier>,
    deriver: Arc<dyn PlanDeriver>,
    schema_cache: Arc<ToolSchemaCache>,
    plan_store: Arc<PlanStore>,
    secrets: Arc<SecretsStore>,
    user_context: Arc<UserContextStore>,
}

impl PlanExtractor {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        deriver: Arc<dyn PlanDeriver>,
        schema_cache: Arc<ToolSchemaCache>,
        plan_store: Arc<PlanStore>,
        secrets: Arc<SecretsStore>,
        user_context: Arc<UserContextStore>,
    ) -> Self {
        PlanExtractor {
            classifier,
            deriver,
            schema_cache,
            plan_store,
            secrets,
            user_context,
        }
    }

    /// Identifiers visible to a thread: `.env` secrets plus caller resource ids
    fn identifiers_for(&self, thread_id: &str) -> BTreeMap<String, String> {
        let mut identifiers = self.secrets.get_all().clone();
        identifiers.extend(self.user_context.resource_ids(thread_id));
        identifiers
    }

    /// Returns the committed plan, or `None` when the text is pure reflection
    /// or no complete, valid plan can be read from it. A `None` never touches
    /// the plan store.
    pub async fn plan(&self, thread_id: &str, reasoning: &str) -> Option<ExecutionPlan> {
        let intent = match self.classifier.detect(reasoning) {
            Some(intent) => intent,
            None => {
                log::debug!("[PLAN] No tool intent in reasoning on thread {}", thread_id);
                return None;
            }
        };

        let identifiers = self.identifiers_for(thread_id);
        if intent.tool_names.is_empty() {
            let plan = self.derive_valid(reasoning, None, &identifiers).await?;
            return Some(self.commit(thread_id, plan));
        }

        let mut any_cached = false;
        for name in &intent.tool_names {
            let schema = match self.schema_cache.get(name) {
                Some(schema) => schema,
                None => continue,
            };
            any_cached = true;
            if let Some(plan) = self
                .derive_valid(reasoning, Some((name.as_str(), schema.as_ref())), &identifiers)
                .await
            {
                return Some(self.commit(thread_id, plan));
            }
        }
        if !any_cached {
            log::info!(
                "[PLAN] {} has no cached schema; search for it before planning",
                intent.tool_names.join(", ")
            );
        }
        None
    }

    /// Derive a plan for one candidate tool, fill identifiers and validate it
    async fn derive_valid(
        &self,
        reasoning: &str,
        candidate: Option<(&str, &ToolDefinition)>,
        identifiers: &BTreeMap<String, String>,
    ) -> Option<ExecutionPlan> {
        let mut plan = self
            .deriver
            .derive(DerivationRequest {
                scratchpad: reasoning,
                tool_name: candidate.map(|(name, _)| name),
                schema: candidate.map(|(_, schema)| schema),
                secrets: identifiers,
            })
            .await?;

        plan.tool_name = plan.tool_name.trim().trim_start_matches("functions.").to_string();
        let schema = match self.schema_cache.get(&plan.tool_name) {
            Some(schema) => schema,
            None => {
                log::info!("[PLAN] Derived plan names unknown tool {}", plan.tool_name);
                return None;
            }
        };

        let domain = tool_domain(&plan.tool_name);
        for param in &schema.parameters {
            let has_value = match plan.params.get(&param.name) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            };
            if has_value {
                continue;
            }
            if let Some(value) = resolve_identifier(identifiers, domain.as_deref(), &param.name) {
                log::debug!("[PLAN] Filling {} from pre-provisioned identifiers", param.name);
                plan.params.insert(param.name.clone(), Value::String(value.to_string()));
            }
        }

        let report = validate_arguments(&schema.parameters, &plan.params);
        if !report.is_valid() {
            log::info!(
                "[PLAN] Rejected plan for {}: {}",
                plan.tool_name,
                report.to_message().replace('\n', "; ")
            );
            return None;
        }
        Some(plan)
    }

    fn commit(&self, thread_id: &str, plan: ExecutionPlan) -> ExecutionPlan {
        log::info!(
            "[PLAN] Committed plan for {} on thread {} ({} params)",
            plan.tool_name,
            thread_id,
            plan.params.len()
        );
        self.plan_store.upsert(thread_id, plan.clone());
        plan
    }
}
