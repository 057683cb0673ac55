//! Logs agent: per-entry confidence from service match, recency, and
//! severity weight, plus aggregate counts.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::{AgentResult, EvidenceAgent};
use crate::connector::IncidentConnector;
use crate::error::EngineError;
use crate::model::{EntryLevel, Incident, LogEntry, LogsResults};
use crate::prompts::defaults::LOGS_PROMPT;

const SERVICE_WEIGHT: f64 = 0.5;
const RECENCY_WEIGHT: f64 = 0.3;
const SEVERITY_WEIGHT: f64 = 0.2;

/// Horizon for the recency component: entries this far from the incident
/// start score zero on recency.
pub(crate) const RECENCY_HORIZON_SECS: f64 = 3600.0;

pub struct LogsAgent {
    connector: Arc<dyn IncidentConnector>,
}

impl LogsAgent {
    pub fn new(connector: Arc<dyn IncidentConnector>) -> Self {
        Self { connector }
    }
}

pub(crate) fn item_confidence(
    incident: &Incident,
    item_service: &str,
    item_time: chrono::DateTime<chrono::Utc>,
    level: EntryLevel,
) -> f64 {
    let service_match = if incident
        .affected_services
        .iter()
        .any(|s| s.eq_ignore_ascii_case(item_service))
    {
        1.0
    } else {
        0.0
    };
    let elapsed = (incident.created_at - item_time).num_seconds().unsigned_abs() as f64;
    let recency = (1.0 - elapsed / RECENCY_HORIZON_SECS).clamp(0.0, 1.0);
    (SERVICE_WEIGHT * service_match
        + RECENCY_WEIGHT * recency
        + SEVERITY_WEIGHT * level.severity_weight())
    .clamp(0.0, 1.0)
}

#[async_trait]
impl EvidenceAgent for LogsAgent {
    fn name(&self) -> &'static str {
        "logs"
    }

    fn default_prompt(&self) -> &'static str {
        LOGS_PROMPT
    }

    async fn query(&self, incident: &Incident) -> Result<AgentResult, EngineError> {
        let entries = match self.connector.find_logs(incident).await {
            Ok(entries) => entries,
            Err(EngineError::NotSupported(what)) => {
                debug!(%what, "log retrieval not supported; returning empty result");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut logs: Vec<LogEntry> = entries
            .into_iter()
            .map(|mut entry| {
                entry.confidence_score =
                    item_confidence(incident, &entry.service, entry.timestamp, entry.level);
                entry
            })
            .collect();
        logs.sort_by(|a, b| {
            b.confidence_score
                .partial_cmp(&a.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total_count = logs.len();
        let error_count = logs
            .iter()
            .filter(|l| matches!(l.level, EntryLevel::Error | EntryLevel::Critical))
            .count();
        let warning_count = logs.iter().filter(|l| l.level == EntryLevel::Warning).count();

        Ok(AgentResult::Logs(LogsResults {
            source: self.connector.source().to_string(),
            incident_id: incident.id.clone(),
            logs,
            total_count,
            error_count,
            warning_count,
        }))
    }
}
