//! Similar-incidents agent: ranked resolved incidents with their
//! resolutions and a quality assessment.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{AgentResult, AgentSettings, EvidenceAgent};
use crate::connector::IncidentConnector;
use crate::error::EngineError;
use crate::model::{Incident, ServiceNowResults, SimilarIncidentEntry};
use crate::prompts::defaults::SERVICENOW_PROMPT;
use crate::quality;

pub struct SimilarIncidentsAgent {
    connector: Arc<dyn IncidentConnector>,
    settings: AgentSettings,
}

impl SimilarIncidentsAgent {
    pub fn new(connector: Arc<dyn IncidentConnector>, settings: AgentSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }
}

#[async_trait]
impl EvidenceAgent for SimilarIncidentsAgent {
    fn name(&self) -> &'static str {
        "servicenow"
    }

    fn default_prompt(&self) -> &'static str {
        SERVICENOW_PROMPT
    }

    async fn query(&self, incident: &Incident) -> Result<AgentResult, EngineError> {
        let matches = self
            .connector
            .find_similar(
                incident,
                self.settings.similarity_threshold,
                self.settings.max_similar_incidents,
            )
            .await?;

        let entries: Vec<SimilarIncidentEntry> = matches
            .into_iter()
            .filter_map(|m| {
                let resolution = m.ticket.as_ref().and_then(|t| t.resolution.clone());
                let description = m
                    .ticket
                    .as_ref()
                    .and_then(|t| t.description.clone())
                    .or_else(|| {
                        (!m.incident.description.is_empty())
                            .then(|| m.incident.description.clone())
                    });
                // An entry with neither a description nor a resolution has
                // nothing actionable; drop it.
                if resolution.is_none() && description.is_none() {
                    return None;
                }
                Some(SimilarIncidentEntry {
                    incident_id: m.incident.id,
                    title: m.incident.title,
                    similarity_score: m.similarity_score,
                    status: m.incident.status,
                    description,
                    resolution,
                    source: self.connector.source().to_string(),
                })
            })
            .collect();

        let resolutions = entries
            .iter()
            .filter_map(|entry| entry.resolution.clone())
            .collect();
        let quality_assessment = quality::assess(&entries, self.settings.quality);

        Ok(AgentResult::SimilarIncidents(ServiceNowResults {
            source: self.connector.source().to_string(),
            incident_id: incident.id.clone(),
            similar_incidents: entries,
            quality_assessment,
            resolutions,
        }))
    }
}
