//! Evidence agents: one per source, each filling one result slot.
//!
//! Every agent satisfies the same capability set: a name (also its prompt
//! key), a default system prompt, and `query(incident) → AgentResult`.
//! Agents hold a connector reference and shared tunables; the factory
//! builds the five of them in graph order.

mod changes;
mod events;
mod knowledge;
mod logs;
mod similar_incidents;

pub use changes::ChangeCorrelationAgent;
pub use events::EventsAgent;
pub use knowledge::KnowledgeBaseAgent;
pub use logs::LogsAgent;
pub use similar_incidents::SimilarIncidentsAgent;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use crate::connector::{ChangeWindow, IncidentConnector, KnowledgeBaseConnector};
use crate::error::EngineError;
use crate::model::{
    ChangeResults, ConfluenceResults, EventsResults, Incident, LogsResults, ServiceNowResults,
};
use crate::quality::QualityThresholds;
use crate::state::TriageState;

/// Tunables shared by the agents, derived from the `agents` config section.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub max_similar_incidents: usize,
    pub similarity_threshold: f64,
    pub max_knowledge_docs: usize,
    pub context_items: usize,
    pub change_window: ChangeWindow,
    pub quality: QualityThresholds,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from(&config::AgentsConfig::default())
    }
}

impl From<&config::AgentsConfig> for AgentSettings {
    fn from(config: &config::AgentsConfig) -> Self {
        Self {
            max_similar_incidents: config.max_similar_incidents,
            similarity_threshold: config.similarity_threshold,
            max_knowledge_docs: config.max_knowledge_docs,
            context_items: config.context_items,
            change_window: ChangeWindow {
                before: Duration::days(config.change_window_days),
                after: Duration::hours(config.change_window_after_hours),
            },
            quality: QualityThresholds {
                min_text_len: config.min_quality_text_len,
                good: config.quality_good_threshold,
                warning: config.quality_warning_threshold,
            },
        }
    }
}

/// Tagged result of one agent query.
#[derive(Debug, Clone)]
pub enum AgentResult {
    SimilarIncidents(ServiceNowResults),
    Knowledge(ConfluenceResults),
    Changes(ChangeResults),
    Logs(LogsResults),
    Events(EventsResults),
}

impl AgentResult {
    /// Writes the result into its slot of the shared state.
    pub fn apply_to(self, state: &mut TriageState) {
        match self {
            AgentResult::SimilarIncidents(results) => state.servicenow_results = Some(results),
            AgentResult::Knowledge(results) => state.confluence_results = Some(results),
            AgentResult::Changes(results) => state.change_results = Some(results),
            AgentResult::Logs(results) => state.logs_results = Some(results),
            AgentResult::Events(results) => state.events_results = Some(results),
        }
    }
}

/// One evidence source.
#[async_trait]
pub trait EvidenceAgent: Send + Sync {
    /// Agent name; doubles as its node id and prompt-store key.
    fn name(&self) -> &'static str;

    /// Built-in system prompt (the prompt store's reset target).
    fn default_prompt(&self) -> &'static str;

    /// Queries the source for one incident and returns the typed result.
    async fn query(&self, incident: &Incident) -> Result<AgentResult, EngineError>;
}

/// Builds the five agents in graph order.
pub fn build_agents(
    incidents: Arc<dyn IncidentConnector>,
    knowledge_base: Arc<dyn KnowledgeBaseConnector>,
    settings: &AgentSettings,
) -> Vec<Arc<dyn EvidenceAgent>> {
    vec![
        Arc::new(SimilarIncidentsAgent::new(incidents.clone(), settings.clone())),
        Arc::new(KnowledgeBaseAgent::new(knowledge_base, settings.clone())),
        Arc::new(ChangeCorrelationAgent::new(incidents.clone(), settings.clone())),
        Arc::new(LogsAgent::new(incidents.clone())),
        Arc::new(EventsAgent::new(incidents)),
    ]
}
