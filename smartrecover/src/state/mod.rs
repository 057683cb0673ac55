//! Shared state threaded through the triage graph.
//!
//! One [`TriageState`] flows through the incident loader, the five agent
//! nodes, and synthesis; each node fills exactly one slot. The five result
//! slots convert to and from the cached [`AgentData`] map.

use crate::model::{
    AgentData, ChangeResults, ConfluenceResults, EventsResults, Incident, LogsResults,
    ServiceNowResults,
};

/// Per-request graph state.
#[derive(Debug, Clone, Default)]
pub struct TriageState {
    pub incident_id: String,
    pub user_query: String,
    /// Loaded by the incident-loader node; every later node reads it.
    pub incident: Option<Incident>,
    pub servicenow_results: Option<ServiceNowResults>,
    pub confluence_results: Option<ConfluenceResults>,
    pub change_results: Option<ChangeResults>,
    pub logs_results: Option<LogsResults>,
    pub events_results: Option<EventsResults>,
    /// Populated only by the synthesis step.
    pub synthesis: Option<String>,
}

impl TriageState {
    pub fn new(incident_id: impl Into<String>, user_query: impl Into<String>) -> Self {
        Self {
            incident_id: incident_id.into(),
            user_query: user_query.into(),
            ..Self::default()
        }
    }

    /// Hands the five result slots over to the cacheable map.
    pub fn into_agent_data(self) -> AgentData {
        AgentData {
            servicenow_results: self.servicenow_results,
            confluence_results: self.confluence_results,
            change_results: self.change_results,
            logs_results: self.logs_results,
            events_results: self.events_results,
        }
    }
}

/// Phases of one resolve/chat request, for logging and cancellation
/// accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Loading,
    Retrieving,
    Ranking,
    Synthesizing,
    Complete,
    Failed,
    Cancelled,
}

impl std::fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Loading => "loading",
            Self::Retrieving => "retrieving",
            Self::Ranking => "ranking",
            Self::Synthesizing => "synthesizing",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
