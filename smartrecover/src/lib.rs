//! # SmartRecover engine
//!
//! The retrieval-and-synthesis core of the incident-triage service: given
//! an incident, run a sequential state graph of evidence agents over
//! pluggable connectors, rank what they find, and synthesize a resolution
//! recommendation via a pluggable LLM, with streaming follow-up chat that
//! reuses the gathered evidence.
//!
//! ## Main modules
//!
//! - [`model`]: incidents, tickets, documents, changes, log/event items,
//!   and the typed per-agent results ([`AgentData`]).
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`] — the
//!   linear state-in/state-out chain the orchestrator compiles once.
//! - [`agent`]: the five evidence agents behind one [`EvidenceAgent`]
//!   capability set, built from configuration by a factory.
//! - [`connector`]: [`IncidentConnector`] (mock/ServiceNow/Jira) and
//!   [`KnowledgeBaseConnector`] (mock/Confluence) plus their factories.
//! - [`similarity`]: tokenization and the weighted-Jaccard blend.
//! - [`quality`]: quality assessment of similar-incident results.
//! - [`orchestrator`]: graph assembly, graceful degradation, exclusion
//!   filtering, context rendering, confidence, resolve and chat entry
//!   points.
//! - [`cache`]: the per-incident TTL cache of agent results.
//! - [`llm`]: [`LlmClient`] with OpenAI/Gemini/Ollama/mock variants and the
//!   hot-swappable [`LlmHandle`].
//! - [`prompts`]: editable per-agent system prompts with atomic-rename
//!   persistence.
//! - [`promptlog`]: bounded in-memory record of LLM invocations.
//! - [`exclusion`]: per-incident excluded items and accuracy metrics.
//! - [`csvdata`]: loaders for the CSV mock fixtures.

pub mod agent;
pub mod cache;
pub mod connector;
pub mod csvdata;
pub mod error;
pub mod exclusion;
pub mod graph;
pub mod llm;
pub mod model;
pub mod orchestrator;
pub mod promptlog;
pub mod prompts;
pub mod quality;
pub mod similarity;
pub mod state;

pub use agent::{build_agents, AgentResult, AgentSettings, EvidenceAgent};
pub use cache::TtlCache;
pub use connector::{
    build_incident_connector, build_knowledge_base, ChangeWindow, IncidentConnector, KbQuery,
    KnowledgeBaseConnector, MockIncidentConnector, MockKnowledgeBase, ScoredChange,
    SimilarIncidentMatch,
};
pub use error::EngineError;
pub use exclusion::{apply_exclusions, AccuracyMetrics, ExclusionStore};
pub use graph::{CompilationError, CompiledStateGraph, Next, Node, StateGraph, END, START};
pub use llm::{
    build_client, ChatMessage, ChatRole, ChunkStream, LlmClient, LlmHandle, MockLlm,
    PromptContext,
};
pub use model::{
    AgentData, ChangeRecord, ChangeResults, ConfluenceResults, CorrelatedChange, EntryLevel,
    EventRecord, EventsResults, ExcludedItem, Incident, IncidentStatus, KnowledgeDocument,
    LogEntry, LogsResults, RankedDocument, ServiceNowResults, Severity, SimilarIncidentEntry,
    Ticket, TicketKind,
};
pub use orchestrator::{
    confidence_score, render_context, ChatRequest, Orchestrator, ResolveResponse,
};
pub use promptlog::{PromptLogEntry, PromptLogStore, PromptType};
pub use prompts::{PromptStore, PromptView, PROMPT_AGENTS};
pub use quality::{QualityAssessment, QualityLevel, QualityThresholds};
pub use state::{RequestPhase, TriageState};
