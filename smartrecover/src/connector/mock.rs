//! CSV-backed incident connector.
//!
//! Incidents load once at startup and mutate only through `update_status`.
//! Tickets and change fixtures stay immutable. Log and event items are
//! synthesized on demand from the incident's affected services, with stable
//! ids so exclusions can key on them across retrievals.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::debug;

use crate::connector::{ChangeWindow, IncidentConnector, ScoredChange, SimilarIncidentMatch};
use crate::csvdata::{self, ChangeFixture};
use crate::error::EngineError;
use crate::model::{
    EntryLevel, EventRecord, Incident, IncidentStatus, LogEntry, Ticket, TicketKind,
};
use crate::similarity;

const SOURCE: &str = "mock";

/// Log lines synthesized per affected service: (level, minutes before the
/// incident, message template).
const LOG_SHAPES: &[(EntryLevel, i64, &str)] = &[
    (EntryLevel::Error, 4, "connection pool exhausted"),
    (EntryLevel::Error, 9, "upstream request failed with status 503"),
    (EntryLevel::Warning, 14, "retry budget at 80 percent"),
    (EntryLevel::Info, 32, "deployment heartbeat ok"),
];

/// Events synthesized per affected service: (severity, minutes before the
/// incident, event type, message template).
const EVENT_SHAPES: &[(EntryLevel, i64, &str, &str)] = &[
    (EntryLevel::Critical, 3, "health_check", "readiness probe failing"),
    (EntryLevel::Warning, 11, "autoscaling", "scale-up triggered by queue depth"),
    (EntryLevel::Info, 47, "deployment", "rollout completed"),
];

pub struct MockIncidentConnector {
    incidents: RwLock<BTreeMap<String, Incident>>,
    /// Tickets keyed by the incident they describe.
    tickets: HashMap<String, Vec<Ticket>>,
    /// Change fixtures keyed by the target incident.
    changes: HashMap<String, Vec<ChangeFixture>>,
}

impl MockIncidentConnector {
    /// Loads `incidents.csv` (required), `servicenow_tickets.csv` and
    /// `change_correlations.csv` (optional) from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, EngineError> {
        let incidents = csvdata::load_incidents(&dir.join("incidents.csv"))?;

        let tickets_path = dir.join("servicenow_tickets.csv");
        let tickets = if tickets_path.exists() {
            csvdata::load_tickets(&tickets_path)?
        } else {
            debug!(path = %tickets_path.display(), "no ticket fixtures");
            Vec::new()
        };

        let changes_path = dir.join("change_correlations.csv");
        let changes = if changes_path.exists() {
            csvdata::load_changes(&changes_path)?
        } else {
            debug!(path = %changes_path.display(), "no change fixtures");
            Vec::new()
        };

        Ok(Self::from_parts(incidents, tickets, changes))
    }

    /// Builds a connector from in-memory fixtures (tests).
    pub fn from_parts(
        incidents: Vec<Incident>,
        tickets: Vec<Ticket>,
        changes: Vec<ChangeFixture>,
    ) -> Self {
        let incidents = incidents.into_iter().map(|i| (i.id.clone(), i)).collect();
        let mut ticket_map: HashMap<String, Vec<Ticket>> = HashMap::new();
        for ticket in tickets {
            ticket_map
                .entry(ticket.incident_id.clone())
                .or_default()
                .push(ticket);
        }
        let mut change_map: HashMap<String, Vec<ChangeFixture>> = HashMap::new();
        for change in changes {
            change_map
                .entry(change.incident_id.clone())
                .or_default()
                .push(change);
        }
        Self {
            incidents: RwLock::new(incidents),
            tickets: ticket_map,
            changes: change_map,
        }
    }

    fn read_incidents(&self) -> Result<BTreeMap<String, Incident>, EngineError> {
        self.incidents
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| EngineError::Upstream("incident store lock poisoned".to_string()))
    }

    /// First similar-incident ticket describing `incident_id`, if any.
    fn resolution_ticket(&self, incident_id: &str) -> Option<&Ticket> {
        self.tickets
            .get(incident_id)?
            .iter()
            .find(|t| t.kind == TicketKind::SimilarIncident && t.is_usable())
    }
}

#[async_trait]
impl IncidentConnector for MockIncidentConnector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn list_incidents(&self) -> Result<Vec<Incident>, EngineError> {
        Ok(self.read_incidents()?.into_values().collect())
    }

    async fn get_incident(&self, id: &str) -> Result<Incident, EngineError> {
        self.read_incidents()?
            .remove(id)
            .ok_or_else(|| EngineError::NotFound(format!("incident {id}")))
    }

    async fn update_status(
        &self,
        id: &str,
        status: IncidentStatus,
    ) -> Result<Incident, EngineError> {
        let mut incidents = self
            .incidents
            .write()
            .map_err(|_| EngineError::Upstream("incident store lock poisoned".to_string()))?;
        let incident = incidents
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("incident {id}")))?;
        incident.status = status;
        incident.updated_at = Some(Utc::now());
        Ok(incident.clone())
    }

    async fn find_similar(
        &self,
        incident: &Incident,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SimilarIncidentMatch>, EngineError> {
        let incidents = self.read_incidents()?;
        let mut matches: Vec<SimilarIncidentMatch> = incidents
            .values()
            .filter(|candidate| candidate.id != incident.id)
            .filter(|candidate| candidate.status == IncidentStatus::Resolved)
            .filter_map(|candidate| {
                let score = similarity::incident_similarity(incident, candidate);
                (score >= threshold).then(|| SimilarIncidentMatch {
                    incident: candidate.clone(),
                    ticket: self.resolution_ticket(&candidate.id).cloned(),
                    similarity_score: score,
                })
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.incident.id.cmp(&b.incident.id))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn find_changes(
        &self,
        incident: &Incident,
        window: ChangeWindow,
    ) -> Result<Vec<ScoredChange>, EngineError> {
        let fixtures = self.changes.get(&incident.id).cloned().unwrap_or_default();
        Ok(fixtures
            .into_iter()
            .filter(|f| window.contains(incident.created_at, f.change.deployed_at))
            .map(|f| ScoredChange {
                change: f.change,
                connector_score: f.fixture_score,
            })
            .collect())
    }

    async fn find_logs(&self, incident: &Incident) -> Result<Vec<LogEntry>, EngineError> {
        let mut logs = Vec::new();
        for (service_index, service) in incident.affected_services.iter().enumerate() {
            for (shape_index, (level, minutes, template)) in LOG_SHAPES.iter().enumerate() {
                logs.push(LogEntry {
                    id: format!("LOG-{}-{}-{}", incident.id, service_index, shape_index),
                    timestamp: incident.created_at - Duration::minutes(*minutes),
                    level: *level,
                    service: service.clone(),
                    message: format!("{service}: {template}"),
                    confidence_score: 0.0,
                });
            }
        }
        Ok(logs)
    }

    async fn find_events(&self, incident: &Incident) -> Result<Vec<EventRecord>, EngineError> {
        let mut events = Vec::new();
        for (service_index, service) in incident.affected_services.iter().enumerate() {
            for (shape_index, (severity, minutes, event_type, template)) in
                EVENT_SHAPES.iter().enumerate()
            {
                events.push(EventRecord {
                    id: format!("EVT-{}-{}-{}", incident.id, service_index, shape_index),
                    timestamp: incident.created_at - Duration::minutes(*minutes),
                    severity: *severity,
                    application: service.clone(),
                    event_type: event_type.to_string(),
                    message: format!("{service}: {template}"),
                    confidence_score: 0.0,
                });
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use chrono::TimeZone;

    fn incident(id: &str, title: &str, status: IncidentStatus, services: &[&str]) -> Incident {
        Incident {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("{title} affecting production"),
            severity: Severity::High,
            status,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            updated_at: None,
            affected_services: services.iter().map(|s| s.to_string()).collect(),
            assignee: None,
        }
    }

    fn connector() -> MockIncidentConnector {
        MockIncidentConnector::from_parts(
            vec![
                incident("INC001", "Checkout latency spike", IncidentStatus::Open, &["checkout"]),
                incident(
                    "INC007",
                    "Checkout latency spike",
                    IncidentStatus::Resolved,
                    &["checkout"],
                ),
                incident(
                    "INC008",
                    "Checkout latency spike",
                    IncidentStatus::Open,
                    &["checkout"],
                ),
            ],
            vec![Ticket {
                ticket_id: "TKT100".to_string(),
                incident_id: "INC007".to_string(),
                kind: TicketKind::SimilarIncident,
                resolution: Some("scaled out the checkout pool".to_string()),
                description: None,
                source: "mock".to_string(),
            }],
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn find_similar_excludes_self_and_unresolved() {
        let connector = connector();
        let target = connector.get_incident("INC001").await.unwrap();
        let matches = connector.find_similar(&target, 0.2, 5).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.incident.id.as_str()).collect();
        // INC008 is identical but not resolved; INC001 is the target itself.
        assert_eq!(ids, vec!["INC007"]);
        assert_eq!(
            matches[0].ticket.as_ref().and_then(|t| t.resolution.as_deref()),
            Some("scaled out the checkout pool")
        );
    }

    #[tokio::test]
    async fn update_status_is_visible_to_readers() {
        let connector = connector();
        let updated = connector
            .update_status("INC001", IncidentStatus::Investigating)
            .await
            .unwrap();
        assert_eq!(updated.status, IncidentStatus::Investigating);
        assert!(updated.updated_at.is_some());
        let read_back = connector.get_incident("INC001").await.unwrap();
        assert_eq!(read_back.status, IncidentStatus::Investigating);
    }

    #[tokio::test]
    async fn update_status_of_unknown_incident_is_not_found() {
        let connector = connector();
        let err = connector
            .update_status("INC999", IncidentStatus::Resolved)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn synthesized_logs_are_deterministic_with_stable_ids() {
        let connector = connector();
        let target = connector.get_incident("INC001").await.unwrap();
        let first = connector.find_logs(&target).await.unwrap();
        let second = connector.find_logs(&target).await.unwrap();
        assert_eq!(first.len(), LOG_SHAPES.len());
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].id, "LOG-INC001-0-0");
        let errors = first.iter().filter(|l| l.level == EntryLevel::Error).count();
        assert_eq!(errors, 2);
    }

    #[tokio::test]
    async fn window_filters_changes() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let in_window = ChangeFixture {
            incident_id: "INC001".to_string(),
            change: crate::model::ChangeRecord {
                change_id: "CHG1".to_string(),
                description: "gateway rollout".to_string(),
                deployed_at: created - Duration::hours(3),
                service: None,
            },
            fixture_score: Some(0.9),
        };
        let stale = ChangeFixture {
            incident_id: "INC001".to_string(),
            change: crate::model::ChangeRecord {
                change_id: "CHG2".to_string(),
                description: "ancient change".to_string(),
                deployed_at: created - Duration::days(30),
                service: None,
            },
            fixture_score: None,
        };
        let connector = MockIncidentConnector::from_parts(
            vec![incident("INC001", "Checkout latency", IncidentStatus::Open, &["checkout"])],
            Vec::new(),
            vec![in_window, stale],
        );
        let target = connector.get_incident("INC001").await.unwrap();
        let window = ChangeWindow {
            before: Duration::days(7),
            after: Duration::hours(1),
        };
        let changes = connector.find_changes(&target, window).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change.change_id, "CHG1");
        assert_eq!(changes[0].connector_score, Some(0.9));
    }
}
