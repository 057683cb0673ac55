//! Pluggable data-source connectors.
//!
//! Two families: [`IncidentConnector`] (incident store, similar incidents,
//! changes, logs, events) and [`KnowledgeBaseConnector`] (document search).
//! Each has a mock variant backed by CSV fixtures and one or more REST
//! variants. A factory builds the configured variant from its tagged config
//! record.
//!
//! REST variants may raise [`EngineError::NotSupported`] for operations
//! their backend cannot serve (log/event retrieval); agents turn that into
//! empty results without failing the graph.

pub mod confluence;
mod http;
pub mod jira;
pub mod kb_mock;
pub mod mock;
pub mod servicenow;

pub use confluence::ConfluenceConnector;
pub use jira::JiraConnector;
pub use kb_mock::MockKnowledgeBase;
pub use mock::MockIncidentConnector;
pub use servicenow::ServiceNowConnector;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::model::{ChangeRecord, EventRecord, Incident, IncidentStatus, KnowledgeDocument, LogEntry, Ticket};

/// Time window for change retrieval around an incident's creation instant.
#[derive(Debug, Clone, Copy)]
pub struct ChangeWindow {
    pub before: chrono::Duration,
    pub after: chrono::Duration,
}

impl ChangeWindow {
    /// Window bounds `[created_at - before, created_at + after]`.
    pub fn bounds(&self, created_at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (created_at - self.before, created_at + self.after)
    }

    pub fn contains(&self, created_at: DateTime<Utc>, deployed_at: DateTime<Utc>) -> bool {
        let (from, to) = self.bounds(created_at);
        deployed_at >= from && deployed_at <= to
    }
}

/// A change returned by a connector. Fixture-backed connectors may supply
/// the retrieval-time correlation score directly; otherwise the change
/// agent computes one.
#[derive(Debug, Clone)]
pub struct ScoredChange {
    pub change: ChangeRecord,
    pub connector_score: Option<f64>,
}

/// A similar historical incident with its similarity score and, when the
/// backend has one, the ticket that carries its resolution.
#[derive(Debug, Clone)]
pub struct SimilarIncidentMatch {
    pub incident: Incident,
    pub ticket: Option<Ticket>,
    pub similarity_score: f64,
}

/// Query handed to a knowledge base: incident tokens plus, for mock mode,
/// the incident identity so fixture-associated documents surface.
#[derive(Debug, Clone)]
pub struct KbQuery {
    pub terms: Vec<String>,
    pub incident_id: Option<String>,
}

/// Incident-source capability set. The mock variant implements every
/// operation deterministically; REST variants may not-support logs/events.
#[async_trait]
pub trait IncidentConnector: Send + Sync {
    /// Source tag carried into results (e.g. `mock`, `servicenow`, `jira`).
    fn source(&self) -> &str;

    async fn list_incidents(&self) -> Result<Vec<Incident>, EngineError>;

    async fn get_incident(&self, id: &str) -> Result<Incident, EngineError>;

    /// Applies a status transition; readers observe either the old or the
    /// new incident, never a partial write.
    async fn update_status(
        &self,
        id: &str,
        status: IncidentStatus,
    ) -> Result<Incident, EngineError>;

    /// Resolved incidents similar to `incident`, scored by weighted Jaccard,
    /// never including `incident` itself, best first.
    async fn find_similar(
        &self,
        incident: &Incident,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SimilarIncidentMatch>, EngineError>;

    /// Changes deployed within `window` around the incident's creation.
    async fn find_changes(
        &self,
        incident: &Incident,
        window: ChangeWindow,
    ) -> Result<Vec<ScoredChange>, EngineError>;

    async fn find_logs(&self, incident: &Incident) -> Result<Vec<LogEntry>, EngineError>;

    async fn find_events(&self, incident: &Incident) -> Result<Vec<EventRecord>, EngineError>;
}

/// Knowledge-base capability set.
#[async_trait]
pub trait KnowledgeBaseConnector: Send + Sync {
    fn source(&self) -> &str;

    /// Candidate documents for the query; the agent ranks and truncates.
    async fn search(
        &self,
        query: &KbQuery,
        limit: usize,
    ) -> Result<Vec<KnowledgeDocument>, EngineError>;

    async fn get(&self, doc_id: &str) -> Result<KnowledgeDocument, EngineError>;
}

/// Builds the configured incident connector.
pub fn build_incident_connector(
    config: &config::IncidentConnectorConfig,
    timeout: Duration,
) -> Result<Arc<dyn IncidentConnector>, EngineError> {
    match config {
        config::IncidentConnectorConfig::Mock(mock) => {
            Ok(Arc::new(MockIncidentConnector::from_dir(&mock.data_dir)?))
        }
        config::IncidentConnectorConfig::Servicenow(sn) => Ok(Arc::new(ServiceNowConnector::new(
            &sn.instance_url,
            &sn.username,
            &sn.password,
            timeout,
        )?)),
        config::IncidentConnectorConfig::Jira(jira) => Ok(Arc::new(JiraConnector::new(
            &jira.base_url,
            &jira.email,
            &jira.api_token,
            jira.project.clone(),
            timeout,
        )?)),
    }
}

/// Builds the configured knowledge-base connector.
pub fn build_knowledge_base(
    config: &config::KnowledgeBaseConfig,
    timeout: Duration,
) -> Result<Arc<dyn KnowledgeBaseConnector>, EngineError> {
    match config {
        config::KnowledgeBaseConfig::Mock(mock) => Ok(Arc::new(MockKnowledgeBase::from_sources(
            mock.csv_path.as_deref(),
            mock.docs_folder.as_deref(),
        )?)),
        config::KnowledgeBaseConfig::Confluence(confluence) => {
            Ok(Arc::new(ConfluenceConnector::new(
                &confluence.base_url,
                &confluence.username,
                &confluence.api_token,
                confluence.space_key.clone(),
                timeout,
            )?))
        }
    }
}
