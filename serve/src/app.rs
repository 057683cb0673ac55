//! Axum app: shared state, router, and state construction from config.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;

use config::AppConfig;
use smartrecover::{
    build_incident_connector, build_knowledge_base, AgentSettings, EngineError, ExclusionStore,
    IncidentConnector, LlmHandle, Orchestrator, PromptLogStore, PromptStore, TtlCache,
};

use crate::handlers;
use crate::trace::trace_middleware;

/// Everything the handlers need, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub incidents: Arc<dyn IncidentConnector>,
    pub cache: Arc<TtlCache>,
    pub exclusions: Arc<ExclusionStore>,
    pub prompts: Arc<PromptStore>,
    pub prompt_log: Arc<PromptLogStore>,
    pub llm: Arc<LlmHandle>,
    /// Live logging handle; absent when the host process owns tracing
    /// (e.g. tests).
    pub log_handle: Option<Arc<config::tracing_init::LogHandle>>,
}

impl AppState {
    /// Wires stores, connectors, and the orchestrator from configuration.
    pub fn from_config(
        config: &AppConfig,
        log_handle: Option<Arc<config::tracing_init::LogHandle>>,
    ) -> Result<Self, EngineError> {
        let connector_timeout = Duration::from_secs(config.agents.connector_timeout_secs);
        let incidents = build_incident_connector(&config.incident_connector, connector_timeout)?;
        let knowledge_base = build_knowledge_base(&config.knowledge_base, connector_timeout)?;

        let cache = Arc::new(TtlCache::new(Duration::from_secs(config.cache.ttl_seconds)));
        let exclusions = Arc::new(ExclusionStore::new());
        let prompts = Arc::new(PromptStore::new(config.prompts_path.clone())?);
        let prompt_log = Arc::new(PromptLogStore::new(config.prompt_logs.max_entries));
        let llm = Arc::new(LlmHandle::new(config.llm.clone(), prompt_log.clone())?);

        let orchestrator = Arc::new(Orchestrator::new(
            incidents.clone(),
            knowledge_base,
            cache.clone(),
            exclusions.clone(),
            prompts.clone(),
            llm.clone(),
            AgentSettings::from(&config.agents),
        )?);

        Ok(Self {
            orchestrator,
            incidents,
            cache,
            exclusions,
            prompts,
            prompt_log,
            llm,
            log_handle,
        })
    }
}

/// All routes under the fixed version prefix.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/incidents", get(handlers::incidents::list))
        .route("/incidents/:id", get(handlers::incidents::get_one))
        .route("/incidents/:id/status", put(handlers::incidents::update_status))
        .route("/incidents/:id/details", get(handlers::incidents::details))
        .route(
            "/incidents/:id/retrieve-context",
            post(handlers::incidents::retrieve_context),
        )
        .route("/resolve", post(handlers::resolve::resolve))
        .route("/chat/stream", post(handlers::chat::chat_stream))
        .route(
            "/incidents/:id/exclude-item",
            post(handlers::exclusions::exclude_item),
        )
        .route(
            "/incidents/:id/excluded-items",
            get(handlers::exclusions::list_excluded),
        )
        .route(
            "/incidents/:id/excluded-items/:item_id",
            axum::routing::delete(handlers::exclusions::remove_excluded),
        )
        .route(
            "/admin/llm-config",
            get(handlers::admin::get_llm_config).put(handlers::admin::put_llm_config),
        )
        .route(
            "/admin/logging-config",
            get(handlers::admin::get_logging_config).put(handlers::admin::put_logging_config),
        )
        .route("/admin/agent-prompts", get(handlers::admin::list_prompts))
        .route(
            "/admin/agent-prompts/reset",
            post(handlers::admin::reset_prompts),
        )
        .route(
            "/admin/agent-prompts/:agent",
            get(handlers::admin::get_prompt).put(handlers::admin::put_prompt),
        )
        .route("/admin/test-llm", post(handlers::admin::test_llm))
        .route(
            "/admin/accuracy-metrics",
            get(handlers::admin::accuracy_metrics),
        )
        .route(
            "/admin/prompt-logs",
            get(handlers::admin::list_prompt_logs).delete(handlers::admin::clear_prompt_logs),
        );

    Router::new()
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn(trace_middleware))
        .with_state(state)
}
