//! Change-correlation agent: changes in the deployment window scored by
//! service overlap, temporal proximity, and description keyword overlap.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{AgentResult, AgentSettings, EvidenceAgent};
use crate::connector::{ChangeWindow, IncidentConnector};
use crate::error::EngineError;
use crate::model::{ChangeRecord, ChangeResults, CorrelatedChange, Incident};
use crate::prompts::defaults::CHANGE_CORRELATION_PROMPT;
use crate::similarity;

const SERVICE_WEIGHT: f64 = 0.5;
const TEMPORAL_WEIGHT: f64 = 0.3;
const KEYWORD_WEIGHT: f64 = 0.2;

pub struct ChangeCorrelationAgent {
    connector: Arc<dyn IncidentConnector>,
    settings: AgentSettings,
}

impl ChangeCorrelationAgent {
    pub fn new(connector: Arc<dyn IncidentConnector>, settings: AgentSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }
}

/// Correlation score in [0, 1] for one change against one incident.
pub fn correlation_score(
    incident: &Incident,
    incident_tokens: &BTreeSet<String>,
    change: &ChangeRecord,
    window: ChangeWindow,
) -> f64 {
    let services = similarity::service_set(&incident.affected_services);
    let change_service: BTreeSet<String> = change
        .service
        .iter()
        .map(|s| s.to_lowercase())
        .collect();
    let service_overlap = similarity::jaccard(&services, &change_service);

    let elapsed = (incident.created_at - change.deployed_at)
        .num_seconds()
        .unsigned_abs() as f64;
    let horizon = window.before.num_seconds().max(1) as f64;
    let temporal = (1.0 - elapsed / horizon).clamp(0.0, 1.0);

    let keyword = similarity::keyword_overlap(incident_tokens, &change.description);

    (SERVICE_WEIGHT * service_overlap + TEMPORAL_WEIGHT * temporal + KEYWORD_WEIGHT * keyword)
        .clamp(0.0, 1.0)
}

#[async_trait]
impl EvidenceAgent for ChangeCorrelationAgent {
    fn name(&self) -> &'static str {
        "change_correlation"
    }

    fn default_prompt(&self) -> &'static str {
        CHANGE_CORRELATION_PROMPT
    }

    async fn query(&self, incident: &Incident) -> Result<AgentResult, EngineError> {
        let window = self.settings.change_window;
        let scored = self.connector.find_changes(incident, window).await?;
        let incident_tokens = similarity::incident_tokens(incident);

        let correlations: Vec<CorrelatedChange> = scored
            .into_iter()
            .map(|candidate| {
                let score = candidate.connector_score.unwrap_or_else(|| {
                    correlation_score(incident, &incident_tokens, &candidate.change, window)
                });
                CorrelatedChange {
                    change: candidate.change,
                    correlation_score: score,
                }
            })
            .collect();

        Ok(AgentResult::Changes(ChangeResults::from_correlations(
            self.connector.source(),
            incident.id.clone(),
            correlations,
        )))
    }
}
