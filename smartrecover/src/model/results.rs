//! Typed agent results and the combined per-incident `AgentData` map.
//!
//! The outer field names (`servicenow_results`, `confluence_results`,
//! `change_results`, `logs_results`, `events_results`) and the inner shapes
//! are the wire contract shared by the cache, the details endpoint, and the
//! resolve/chat context builders.

use serde::{Deserialize, Serialize};

use crate::model::{CorrelatedChange, EventRecord, IncidentStatus, LogEntry};
use crate::quality::QualityAssessment;

/// One similar historical incident, ranked by weighted-Jaccard similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarIncidentEntry {
    pub incident_id: String,
    pub title: String,
    pub similarity_score: f64,
    pub status: IncidentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub source: String,
}

/// Output of the similar-incidents agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceNowResults {
    pub source: String,
    pub incident_id: String,
    pub similar_incidents: Vec<SimilarIncidentEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_assessment: Option<QualityAssessment>,
    /// Resolutions of the similar incidents, in rank order.
    pub resolutions: Vec<String>,
}

/// One knowledge document ranked by keyword overlap; `content` is truncated
/// at a word boundary by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDocument {
    pub doc_id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub relevance_score: f64,
}

/// Output of the knowledge-base agent. `knowledge_base_articles` carries the
/// ranked titles for consumers that only read titles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceResults {
    pub source: String,
    pub incident_id: String,
    pub documents: Vec<RankedDocument>,
    pub knowledge_base_articles: Vec<String>,
}

/// Output of the change-correlation agent: scored changes partitioned by
/// correlation band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeResults {
    pub source: String,
    pub incident_id: String,
    pub top_suspect: Option<CorrelatedChange>,
    pub high_correlation_changes: Vec<CorrelatedChange>,
    pub medium_correlation_changes: Vec<CorrelatedChange>,
    pub all_correlations: Vec<CorrelatedChange>,
}

impl ChangeResults {
    /// Partition threshold for the single top suspect.
    pub const TOP_SUSPECT_MIN: f64 = 0.7;
    /// Lower bound of the high-correlation band.
    pub const HIGH_MIN: f64 = 0.5;
    /// Lower bound of the medium band; below this the change is dropped.
    pub const MEDIUM_MIN: f64 = 0.3;

    /// Builds the partitioned view from scored changes. Changes below the
    /// medium band are dropped; ordering is by descending score with ties
    /// broken by `change_id`. Recomputable, so exclusion filtering rebuilds
    /// the partitions after removing an item.
    pub fn from_correlations(
        source: impl Into<String>,
        incident_id: impl Into<String>,
        mut correlations: Vec<CorrelatedChange>,
    ) -> Self {
        correlations.retain(|c| c.correlation_score >= Self::MEDIUM_MIN);
        correlations.sort_by(|a, b| {
            b.correlation_score
                .partial_cmp(&a.correlation_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.change.change_id.cmp(&b.change.change_id))
        });

        let top_suspect = correlations
            .first()
            .filter(|c| c.correlation_score >= Self::TOP_SUSPECT_MIN)
            .cloned();
        let top_id = top_suspect.as_ref().map(|c| c.change.change_id.clone());

        let high_correlation_changes = correlations
            .iter()
            .filter(|c| {
                c.correlation_score >= Self::HIGH_MIN
                    && Some(&c.change.change_id) != top_id.as_ref()
            })
            .cloned()
            .collect();
        let medium_correlation_changes = correlations
            .iter()
            .filter(|c| {
                c.correlation_score >= Self::MEDIUM_MIN && c.correlation_score < Self::HIGH_MIN
            })
            .cloned()
            .collect();

        Self {
            source: source.into(),
            incident_id: incident_id.into(),
            top_suspect,
            high_correlation_changes,
            medium_correlation_changes,
            all_correlations: correlations,
        }
    }
}

/// Output of the logs agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResults {
    pub source: String,
    pub incident_id: String,
    pub logs: Vec<LogEntry>,
    pub total_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

/// Output of the events agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResults {
    pub source: String,
    pub incident_id: String,
    pub events: Vec<EventRecord>,
    pub total_count: usize,
    pub critical_count: usize,
    pub warning_count: usize,
}

/// The combined results of all five agents for one incident. Slots a node
/// failed to fill stay `None`; synthesis runs with whatever is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servicenow_results: Option<ServiceNowResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confluence_results: Option<ConfluenceResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_results: Option<ChangeResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_results: Option<LogsResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_results: Option<EventsResults>,
}

impl AgentData {
    /// True when no agent produced anything.
    pub fn is_empty(&self) -> bool {
        self.servicenow_results.is_none()
            && self.confluence_results.is_none()
            && self.change_results.is_none()
            && self.logs_results.is_none()
            && self.events_results.is_none()
    }
}
