//! Core data model: incidents, tickets, knowledge documents, changes, and
//! the transient log/event items.
//!
//! Field names on these types are part of the wire contract; serde renames
//! are chosen to match it exactly. Scores (`correlation_score`,
//! `confidence_score`, `similarity_score`) are computed at retrieval time
//! and never persisted.

pub mod results;

pub use results::{
    AgentData, ChangeResults, ConfluenceResults, EventsResults, LogsResults, RankedDocument,
    ServiceNowResults, SimilarIncidentEntry,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incident severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Incident lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Resolved,
}

impl std::str::FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "investigating" => Ok(Self::Investigating),
            "resolved" => Ok(Self::Resolved),
            _ => Err(format!(
                "unknown status: {} (use open, investigating, or resolved)",
                s
            )),
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
        };
        f.write_str(s)
    }
}

/// One incident as loaded from the incident store. Mutated only through the
/// status-update operation; never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub affected_services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

/// What a ticket row describes: a resolved similar incident or a deployed
/// change tied to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    SimilarIncident,
    RelatedChange,
}

impl std::str::FromStr for TicketKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "similar_incident" => Ok(Self::SimilarIncident),
            "related_change" => Ok(Self::RelatedChange),
            _ => Err(format!("unknown ticket type: {}", s)),
        }
    }
}

/// A ticket attached to one incident. When `kind` is `similar_incident` the
/// `resolution` should be present; when `related_change`, the `description`.
/// Tickets violating that are filtered out of agent results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    pub incident_id: String,
    #[serde(rename = "type")]
    pub kind: TicketKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: String,
}

impl Ticket {
    /// A ticket is usable when the field its kind calls for is present.
    pub fn is_usable(&self) -> bool {
        match self.kind {
            TicketKind::SimilarIncident => self.resolution.is_some() || self.description.is_some(),
            TicketKind::RelatedChange => self.description.is_some(),
        }
    }
}

/// A knowledge-base document. `content` is opaque text to the ranker;
/// `title` is always non-empty (loaders fall back to the file name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub doc_id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Mock-mode association with one incident; external KBs leave it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,
}

/// A deployed change as returned by the incident connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub change_id: String,
    pub description: String,
    pub deployed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// A change scored against one incident at retrieval time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatedChange {
    #[serde(flatten)]
    pub change: ChangeRecord,
    pub correlation_score: f64,
}

/// Severity/level of a log or event item. `warn` parses as an alias of
/// `warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl EntryLevel {
    /// Weight used in the log/event confidence score.
    pub fn severity_weight(self) -> f64 {
        match self {
            EntryLevel::Error | EntryLevel::Critical => 1.0,
            EntryLevel::Warning => 0.6,
            EntryLevel::Info | EntryLevel::Debug => 0.2,
        }
    }
}

impl std::str::FromStr for EntryLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("unknown level: {}", s)),
        }
    }
}

/// One log line relevant to an incident. Produced on demand, never
/// persisted; `id` is stable for a given incident so exclusions can key on
/// it, `confidence_score` is filled in by the logs agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: EntryLevel,
    pub service: String,
    pub message: String,
    #[serde(default)]
    pub confidence_score: f64,
}

/// One platform event relevant to an incident; same lifecycle as
/// [`LogEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: EntryLevel,
    pub application: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub message: String,
    #[serde(default)]
    pub confidence_score: f64,
}

/// An item the user marked irrelevant for an incident. Filtering matches on
/// `item_id`; `kind` routes the accuracy counters, `source` is informative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExcludedItem {
    pub item_id: String,
    pub kind: String,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_and_status_round_trip_lowercase() {
        let incident_json = serde_json::json!({
            "id": "INC001",
            "title": "Checkout latency",
            "description": "p99 above 2s",
            "severity": "high",
            "status": "investigating",
            "created_at": "2024-03-01T10:00:00Z",
            "affected_services": ["checkout", "payments"]
        });
        let incident: Incident = serde_json::from_value(incident_json).unwrap();
        assert_eq!(incident.severity, Severity::High);
        assert_eq!(incident.status, IncidentStatus::Investigating);
        let back = serde_json::to_value(&incident).unwrap();
        assert_eq!(back["severity"], "high");
        assert!(back.get("assignee").is_none());
    }

    #[test]
    fn ticket_usability_follows_kind() {
        let similar = Ticket {
            ticket_id: "TKT1".into(),
            incident_id: "INC007".into(),
            kind: TicketKind::SimilarIncident,
            resolution: Some("restarted the pool".into()),
            description: None,
            source: "mock".into(),
        };
        assert!(similar.is_usable());

        let bare_change = Ticket {
            ticket_id: "TKT2".into(),
            incident_id: "INC007".into(),
            kind: TicketKind::RelatedChange,
            resolution: None,
            description: None,
            source: "mock".into(),
        };
        assert!(!bare_change.is_usable());
    }

    #[test]
    fn entry_level_weights_match_severity_classes() {
        assert_eq!(EntryLevel::Error.severity_weight(), 1.0);
        assert_eq!(EntryLevel::Critical.severity_weight(), 1.0);
        assert_eq!(EntryLevel::Warning.severity_weight(), 0.6);
        assert_eq!(EntryLevel::Info.severity_weight(), 0.2);
        assert_eq!("warn".parse::<EntryLevel>().unwrap(), EntryLevel::Warning);
    }
}
