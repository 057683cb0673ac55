//! Orchestrator: runs the retrieval graph, applies exclusions, and drives
//! LLM synthesis and chat.
//!
//! The graph is compiled once at startup:
//!
//! ```text
//! incident-loader → servicenow → knowledge_base → change_correlation
//!                → logs → events
//! ```
//!
//! Agent nodes degrade gracefully: a failing agent logs a warning and
//! leaves its slot empty, and synthesis runs with whatever evidence
//! exists. Only a failed incident load aborts a request. Exclusions are
//! applied after retrieval on every read path, so cached data stays raw
//! and newly excluded items disappear immediately.

mod confidence;
mod context;

pub use confidence::confidence_score;
pub use context::render_context;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::{build_agents, AgentSettings, EvidenceAgent};
use crate::cache::TtlCache;
use crate::connector::{IncidentConnector, KnowledgeBaseConnector};
use crate::error::EngineError;
use crate::exclusion::{apply_exclusions, ExclusionStore};
use crate::graph::{CompiledStateGraph, Next, Node, StateGraph, END, START};
use crate::llm::{ChatMessage, ChunkStream, LlmHandle, PromptContext};
use crate::model::{AgentData, CorrelatedChange, ExcludedItem, Incident};
use crate::promptlog::{summarize_context, PromptType};
use crate::prompts::PromptStore;
use crate::state::{RequestPhase, TriageState};

/// First node: loads the incident into the state. Failure here is the one
/// hard failure of a run.
struct IncidentLoaderNode {
    connector: Arc<dyn IncidentConnector>,
}

#[async_trait]
impl Node<TriageState> for IncidentLoaderNode {
    fn id(&self) -> &str {
        "incident-loader"
    }

    async fn run(&self, mut state: TriageState) -> Result<(TriageState, Next), EngineError> {
        let incident = self.connector.get_incident(&state.incident_id).await?;
        state.incident = Some(incident);
        Ok((state, Next::Continue))
    }
}

/// Wraps one evidence agent as a graph node with per-node graceful
/// degradation.
struct AgentNode {
    agent: Arc<dyn EvidenceAgent>,
}

#[async_trait]
impl Node<TriageState> for AgentNode {
    fn id(&self) -> &str {
        self.agent.name()
    }

    async fn run(&self, mut state: TriageState) -> Result<(TriageState, Next), EngineError> {
        let Some(incident) = state.incident.clone() else {
            warn!(agent = self.agent.name(), "no incident loaded; skipping");
            return Ok((state, Next::Continue));
        };
        match self.agent.query(&incident).await {
            Ok(result) => result.apply_to(&mut state),
            Err(e) => {
                warn!(
                    agent = self.agent.name(),
                    incident = %incident.id,
                    error = %e,
                    "agent failed; leaving result slot empty"
                );
            }
        }
        Ok((state, Next::Continue))
    }
}

/// Structured output of a resolve request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub incident_id: String,
    pub summary: String,
    pub resolution_steps: Vec<String>,
    pub related_knowledge: Vec<String>,
    pub correlated_changes: Vec<CorrelatedChange>,
    pub confidence: f64,
}

/// Input of a streaming chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub incident_id: String,
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(default)]
    pub excluded_items: Vec<ExcludedItem>,
}

pub struct Orchestrator {
    incidents: Arc<dyn IncidentConnector>,
    graph: CompiledStateGraph<TriageState>,
    cache: Arc<TtlCache>,
    exclusions: Arc<ExclusionStore>,
    prompts: Arc<PromptStore>,
    llm: Arc<LlmHandle>,
    settings: AgentSettings,
}

impl Orchestrator {
    pub fn new(
        incidents: Arc<dyn IncidentConnector>,
        knowledge_base: Arc<dyn KnowledgeBaseConnector>,
        cache: Arc<TtlCache>,
        exclusions: Arc<ExclusionStore>,
        prompts: Arc<PromptStore>,
        llm: Arc<LlmHandle>,
        settings: AgentSettings,
    ) -> Result<Self, EngineError> {
        let agents = build_agents(incidents.clone(), knowledge_base, &settings);
        let mut graph = StateGraph::new();
        graph.add_node(
            "incident-loader",
            Arc::new(IncidentLoaderNode {
                connector: incidents.clone(),
            }) as Arc<dyn Node<TriageState>>,
        );
        graph.add_edge(START, "incident-loader");
        let mut previous = "incident-loader".to_string();
        for agent in agents {
            let id = agent.name().to_string();
            graph.add_node(id.clone(), Arc::new(AgentNode { agent }) as Arc<dyn Node<TriageState>>);
            graph.add_edge(previous, id.clone());
            previous = id;
        }
        graph.add_edge(previous, END);
        let graph = graph
            .compile()
            .map_err(|e| EngineError::Config(format!("compile triage graph: {e}")))?;

        Ok(Self {
            incidents,
            graph,
            cache,
            exclusions,
            prompts,
            llm,
            settings,
        })
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Runs the retrieval graph and caches the (unfiltered) result.
    #[tracing::instrument(level = "trace", skip(self, user_query))]
    pub async fn retrieve(
        &self,
        incident_id: &str,
        user_query: &str,
    ) -> Result<AgentData, EngineError> {
        debug!(incident = incident_id, phase = %RequestPhase::Loading, "run start");
        let state = TriageState::new(incident_id, user_query);
        debug!(incident = incident_id, phase = %RequestPhase::Retrieving, "running agent graph");
        let state = self.graph.invoke(state).await?;
        debug!(incident = incident_id, phase = %RequestPhase::Ranking, "aggregating results");
        let data = state.into_agent_data();
        self.exclusions.record_returned(&data);
        self.cache.put(incident_id.to_string(), data.clone());
        Ok(data)
    }

    /// Cache-first retrieval; follow-up chat reuses gathered evidence.
    pub async fn get_or_retrieve(
        &self,
        incident_id: &str,
        user_query: &str,
    ) -> Result<AgentData, EngineError> {
        if let Some(data) = self.cache.get(incident_id) {
            debug!(incident = incident_id, "agent-result cache hit");
            return Ok(data);
        }
        self.retrieve(incident_id, user_query).await
    }

    /// Cached evidence with exclusions applied, for the details endpoint.
    pub fn cached_filtered(&self, incident_id: &str) -> Option<AgentData> {
        self.cache
            .get(incident_id)
            .map(|data| self.filtered(incident_id, data, &[]))
    }

    /// Applies the stored exclusion set plus request-scoped extras.
    pub fn filtered(
        &self,
        incident_id: &str,
        data: AgentData,
        extra: &[ExcludedItem],
    ) -> AgentData {
        let mut ids = self.exclusions.excluded_ids(incident_id);
        ids.extend(extra.iter().map(|item| item.item_id.clone()));
        apply_exclusions(data, &ids, self.settings.quality)
    }

    /// Full resolve flow: retrieval (cache-first), exclusion filtering,
    /// blocking synthesis, structured response.
    #[tracing::instrument(level = "trace", skip(self, user_query))]
    pub async fn resolve(
        &self,
        incident_id: &str,
        user_query: &str,
    ) -> Result<ResolveResponse, EngineError> {
        let incident = self.incidents.get_incident(incident_id).await?;
        let data = self.get_or_retrieve(incident_id, user_query).await?;
        let data = self.filtered(incident_id, data, &[]);

        let context = render_context(&incident, &data, self.settings.context_items);
        let confidence = confidence_score(&data);

        debug!(incident = incident_id, phase = %RequestPhase::Synthesizing, "invoking llm");
        let system = self.prompts.effective("synthesis");
        let user_message = format!(
            "Incident context:\n{context}\n\nResponder question: {user_query}\n\n\
             Give a short diagnosis, then numbered resolution steps."
        );
        let prompt_context = PromptContext {
            incident_id: incident_id.to_string(),
            prompt_type: PromptType::Synthesis,
            context_summary: summarize_context(&context),
            conversation_history: Vec::new(),
        };
        let synthesis = self
            .llm
            .complete(&system, &[ChatMessage::user(user_message)], &prompt_context)
            .await?;
        debug!(incident = incident_id, phase = %RequestPhase::Complete, "resolve done");

        Ok(build_resolve_response(
            incident_id,
            &synthesis,
            &data,
            confidence,
        ))
    }

    /// Streaming chat flow: same evidence path as resolve, then a token
    /// stream. Dropping the returned stream cancels the provider call.
    #[tracing::instrument(level = "trace", skip(self, request), fields(incident = %request.incident_id))]
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, EngineError> {
        let incident = self.incidents.get_incident(&request.incident_id).await?;
        let data = self
            .get_or_retrieve(&request.incident_id, &request.message)
            .await?;
        let data = self.filtered(&request.incident_id, data, &request.excluded_items);

        let context = render_context(&incident, &data, self.settings.context_items);
        let system = format!(
            "{}\n\nIncident context:\n{}",
            self.prompts.effective("chat"),
            context
        );
        let mut messages = request.conversation_history.clone();
        messages.push(ChatMessage::user(request.message.clone()));

        debug!(incident = %request.incident_id, phase = %RequestPhase::Synthesizing, "starting chat stream");
        let prompt_context = PromptContext {
            incident_id: request.incident_id.clone(),
            prompt_type: PromptType::Chat,
            context_summary: summarize_context(&context),
            conversation_history: request.conversation_history.clone(),
        };
        self.llm.stream(&system, &messages, &prompt_context).await
    }

    /// Incident plus optionally cached evidence, for `/details`.
    pub async fn details(
        &self,
        incident_id: &str,
    ) -> Result<(Incident, Option<AgentData>), EngineError> {
        let incident = self.incidents.get_incident(incident_id).await?;
        Ok((incident, self.cached_filtered(incident_id)))
    }
}

/// First paragraph of the synthesis.
fn extract_summary(synthesis: &str) -> String {
    let trimmed = synthesis.trim();
    trimmed
        .split("\n\n")
        .next()
        .unwrap_or(trimmed)
        .lines()
        .take_while(|line| !is_step_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_step_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix(|c: char| c.is_ascii_digit()) {
        return rest.starts_with('.') || rest.starts_with(')');
    }
    trimmed.starts_with("- ") || trimmed.starts_with("* ")
}

/// Numbered or bulleted lines of the synthesis, markers stripped.
fn extract_steps(synthesis: &str) -> Vec<String> {
    synthesis
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if !is_step_line(trimmed) {
                return None;
            }
            let stripped = trimmed
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')', '-', '*'])
                .trim();
            (!stripped.is_empty()).then(|| stripped.to_string())
        })
        .collect()
}

fn build_resolve_response(
    incident_id: &str,
    synthesis: &str,
    data: &AgentData,
    confidence: f64,
) -> ResolveResponse {
    let related_knowledge = data
        .confluence_results
        .as_ref()
        .map(|r| r.knowledge_base_articles.clone())
        .unwrap_or_default();
    let correlated_changes = data
        .change_results
        .as_ref()
        .map(|r| r.all_correlations.clone())
        .unwrap_or_default();
    ResolveResponse {
        incident_id: incident_id.to_string(),
        summary: extract_summary(synthesis),
        resolution_steps: extract_steps(synthesis),
        related_knowledge,
        correlated_changes,
        confidence,
    }
}
