use crate::agents::budget::{AgentLimits, ThreadCallCounters};
use crate::ai::ChatModel;
use crate::artifacts::{ArtifactStore, InMemoryArtifactStore};
use crate::catalog::ToolSchemaCache;
use crate::config::DEFAULT_INTEGRATIONS;
use crate::context::UserContextStore;
use crate::discovery::{ToolDiscovery, DEFAULT_TOP_K};
use crate::execution::ExecutionGateway;
use crate::integrations::{IntegrationBroker, ToolSearch};
use crate::planning::{LexicalIntentClassifier, LexicalPlanDeriver, PlanDeriver, PlanExtractor, PlanStore};
use crate::secrets::SecretsStore;
use std::sync::Arc;
use std::time::Duration;

/// Every store and collaborator an agent run touches, passed explicitly to
/// agents and tools. Stores are shared, so many runs may use one context.
pub struct RunContext {
    pub model: Arc<dyn ChatModel>,
    pub search: Arc<dyn ToolSearch>,
    pub broker: Arc<dyn IntegrationBroker>,
    pub schema_cache: Arc<ToolSchemaCache>,
    pub plan_store: Arc<PlanStore>,
    pub user_context: Arc<UserContextStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub secrets: Arc<SecretsStore>,
    pub known_domains: Vec<String>,
    pub limits: AgentLimits,
    pub thread_counters: Arc<ThreadCallCounters>,
    pub extractor: PlanExtractor,
    pub discovery: ToolDiscovery,
    pub gateway: ExecutionGateway,
    pub search_top_k: usize,
}

impl RunContext {
    pub fn builder(
        model: Arc<dyn ChatModel>,
        search: Arc<dyn ToolSearch>,
        broker: Arc<dyn IntegrationBroker>,
    ) -> RunContextBuilder {
        RunContextBuilder {
            model,
            search,
            broker,
            secrets: SecretsStore::empty(),
            limits: AgentLimits::default(),
            domains: DEFAULT_INTEGRATIONS.iter().map(|d| d.to_string()).collect(),
            plan_deriver: None,
            plan_ttl: None,
            schema_cache_capacity: None,
            default_user_id: "default".to_string(),
            artifacts: None,
            search_top_k: DEFAULT_TOP_K,
        }
    }
}

pub struct RunContextBuilder {
    model: Arc<dyn ChatModel>,
    search: Arc<dyn ToolSearch>,
    broker: Arc<dyn IntegrationBroker>,
    secrets: SecretsStore,
    limits: AgentLimits,
    domains: Vec<String>,
    plan_deriver: Option<Arc<dyn PlanDeriver>>,
    plan_ttl: Option<Duration>,
    schema_cache_capacity: Option<u64>,
    default_user_id: String,
    artifacts: Option<Arc<dyn ArtifactStore>>,
    search_top_k: usize,
}

impl RunContextBuilder {
    pub fn with_secrets(mut self, secrets: SecretsStore) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_limits(mut self, limits: AgentLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    /// Defaults to [`LexicalPlanDeriver`]
    pub fn with_plan_deriver(mut self, deriver: Arc<dyn PlanDeriver>) -> Self {
        self.plan_deriver = Some(deriver);
        self
    }

    pub fn with_plan_ttl(mut self, ttl: Duration) -> Self {
        self.plan_ttl = Some(ttl);
        self
    }

    pub fn with_schema_cache_capacity(mut self, capacity: Option<u64>) -> Self {
        self.schema_cache_capacity = capacity;
        self
    }

    /// User id for threads whose request context carried none
    pub fn with_default_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.default_user_id = user_id.into();
        self
    }

    pub fn with_artifacts(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn with_search_top_k(mut self, top_k: usize) -> Self {
        self.search_top_k = top_k;
        self
    }

    pub fn build(self) -> Arc<RunContext> {
        let schema_cache = Arc::new(ToolSchemaCache::new(self.schema_cache_capacity));
        let plan_store = Arc::new(PlanStore::new(self.plan_ttl));
        let user_context = Arc::new(UserContextStore::new(self.default_user_id));
        let secrets = Arc::new(self.secrets);
        let artifacts = self
            .artifacts
            .unwrap_or_else(|| Arc::new(InMemoryArtifactStore::new()));
        let deriver = self
            .plan_deriver
            .unwrap_or_else(|| Arc::new(LexicalPlanDeriver::new()));

        let extractor = PlanExtractor::new(
            Arc::new(LexicalIntentClassifier::new(&self.domains)),
            deriver,
            schema_cache.clone(),
            plan_store.clone(),
            secrets.clone(),
            user_context.clone(),
        );
        let discovery = ToolDiscovery::new(self.search.clone(), self.broker.clone(), schema_cache.clone());
        let gateway = ExecutionGateway::new(
            plan_store.clone(),
            schema_cache.clone(),
            self.broker.clone(),
            user_context.clone(),
        );

        log::info!(
            "[RUN] Context ready: domains={:?}, secrets={}, plan_ttl={:?}",
            self.domains,
            secrets.get_all().len(),
            self.plan_ttl
        );

        Arc::new(RunContext {
            model: self.model,
            search: self.search,
            broker: self.broker,
            schema_cache,
            plan_store,
            user_context,
            artifacts,
            secrets,
            known_domains: self.domains,
            limits: self.limits,
            thread_counters: Arc::new(ThreadCallCounters::new()),
            extractor,
            discovery,
            gateway,
            search_top_k: self.search_top_k,
        })
    }
}
