//! Events agent: platform events scored like log entries, with critical and
//! warning counts.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::logs::item_confidence;
use crate::agent::{AgentResult, EvidenceAgent};
use crate::connector::IncidentConnector;
use crate::error::EngineError;
use crate::model::{EntryLevel, EventRecord, EventsResults, Incident};
use crate::prompts::defaults::EVENTS_PROMPT;

pub struct EventsAgent {
    connector: Arc<dyn IncidentConnector>,
}

impl EventsAgent {
    pub fn new(connector: Arc<dyn IncidentConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl EvidenceAgent for EventsAgent {
    fn name(&self) -> &'static str {
        "events"
    }

    fn default_prompt(&self) -> &'static str {
        EVENTS_PROMPT
    }

    async fn query(&self, incident: &Incident) -> Result<AgentResult, EngineError> {
        let records = match self.connector.find_events(incident).await {
            Ok(records) => records,
            Err(EngineError::NotSupported(what)) => {
                debug!(%what, "event retrieval not supported; returning empty result");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut events: Vec<EventRecord> = records
            .into_iter()
            .map(|mut record| {
                record.confidence_score = item_confidence(
                    incident,
                    &record.application,
                    record.timestamp,
                    record.severity,
                );
                record
            })
            .collect();
        events.sort_by(|a, b| {
            b.confidence_score
                .partial_cmp(&a.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total_count = events.len();
        let critical_count = events
            .iter()
            .filter(|e| e.severity == EntryLevel::Critical)
            .count();
        let warning_count = events
            .iter()
            .filter(|e| e.severity == EntryLevel::Warning)
            .count();

        Ok(AgentResult::Events(EventsResults {
            source: self.connector.source().to_string(),
            incident_id: incident.id.clone(),
            events,
            total_count,
            critical_count,
            warning_count,
        }))
    }
}
