//! Supervisor/worker agent orchestrator over a third-party integration broker.
//!
//! A supervisor agent turns a request into domain-grouped todos and delegates
//! each todo to an ephemeral worker. Workers discover broker tools through a
//! semantic search index and may only execute a tool after declaring a
//! schema-valid execution plan through `think`.

pub mod agents;
pub mod ai;
pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod context;
pub mod controllers;
pub mod discovery;
pub mod errors;
pub mod execution;
pub mod http;
pub mod integrations;
pub mod planning;
pub mod secrets;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use agents::Supervisor;
use config::Config;
use context::RunContext;
use integrations::AccountLinker;

/// Shared actix application state.
pub struct AppState {
    pub config: Config,
    pub run_context: Arc<RunContext>,
    pub supervisor: Arc<Supervisor>,
    pub linker: Arc<dyn AccountLinker>,
}

impl AppState {
    /// Wire the model, broker, search index and agents from configuration.
    pub fn from_config(config: Config) -> Result<Self, String> {
        use agents::AgentLimits;
        use ai::openai::OpenAIClient;
        use config::PlanExtractionMode;
        use integrations::composio::ComposioClient;
        use integrations::toolhub::ToolHubClient;
        use integrations::{DisabledToolSearch, ToolSearch};
        use planning::{LexicalPlanDeriver, LlmPlanDeriver, PlanDeriver};
        use secrets::SecretsStore;
        use std::time::Duration;

        let model = Arc::new(OpenAIClient::new(
            &config.openai_api_key,
            config.openai_endpoint.as_deref(),
            Some(&config.openai_model),
        )?);
        let composio = Arc::new(ComposioClient::new(
            &config.composio_api_key,
            config.composio_base_url.as_deref(),
        )?);

        let search: Arc<dyn ToolSearch> = match &config.tool_hub_url {
            Some(url) => Arc::new(ToolHubClient::new(url, config.tool_hub_api_key.as_deref())?),
            None => {
                log::warn!("[CONFIG] TOOL_HUB_URL not set, tool search is disabled");
                Arc::new(DisabledToolSearch)
            }
        };

        let deriver: Arc<dyn PlanDeriver> = match config.plan_extraction {
            PlanExtractionMode::Lexical => Arc::new(LexicalPlanDeriver::new()),
            PlanExtractionMode::Llm => {
                let extractor = OpenAIClient::new(
                    &config.openai_api_key,
                    config.openai_endpoint.as_deref(),
                    Some(&config.extractor_model),
                )?
                .with_temperature(0.0);
                Arc::new(LlmPlanDeriver::new(Arc::new(extractor)))
            }
        };
        log::info!("[CONFIG] Plan extraction mode: {}", config.plan_extraction);

        let secrets = SecretsStore::discover();
        if !secrets.is_empty() {
            log::info!("[CONFIG] Loaded {} secret(s) for plan filling", secrets.get_all().len());
        }

        let mut builder = RunContext::builder(model, search, composio.clone())
            .with_limits(AgentLimits::load())
            .with_domains(config.known_integrations.clone())
            .with_plan_deriver(deriver)
            .with_schema_cache_capacity(config.schema_cache_capacity)
            .with_default_user_id(config.composio_user_id.clone())
            .with_secrets(secrets);
        if let Some(top_k) = config.search_top_k {
            builder = builder.with_search_top_k(top_k);
        }
        if config.plan_ttl_secs > 0 {
            builder = builder.with_plan_ttl(Duration::from_secs(config.plan_ttl_secs));
        }
        let run_context = builder.build();

        Ok(AppState {
            config,
            supervisor: Arc::new(Supervisor::new(run_context.clone())),
            run_context,
            linker: composio,
        })
    }
}
