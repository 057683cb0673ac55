//! Jira incident connector (REST v2 search + transitions, basic auth).
//!
//! Issues map onto incidents; components become affected services. Jira has
//! no deployment records, so change retrieval yields nothing, and log/event
//! retrieval is not supported.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::debug;

use crate::connector::http::{self, str_field};
use crate::connector::{ChangeWindow, IncidentConnector, ScoredChange, SimilarIncidentMatch};
use crate::error::EngineError;
use crate::model::{
    EventRecord, Incident, IncidentStatus, LogEntry, Severity, Ticket, TicketKind,
};
use crate::similarity;

const SOURCE: &str = "jira";
const SEARCH_LIMIT: usize = 100;

pub struct JiraConnector {
    client: reqwest::Client,
    base_url: String,
    email: String,
    api_token: String,
    project: Option<String>,
}

impl JiraConnector {
    pub fn new(
        base_url: &str,
        email: &str,
        api_token: &str,
        project: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            api_token: api_token.to_string(),
            project,
        })
    }

    fn jql_scope(&self) -> String {
        match &self.project {
            Some(project) => format!("project = {project}"),
            None => "issuetype = Incident".to_string(),
        }
    }

    async fn search_issues(&self, jql: &str) -> Result<Vec<Value>, EngineError> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let body = http::request_json(
            "jira search issues",
            self.client
                .get(url)
                .basic_auth(&self.email, Some(&self.api_token))
                .query(&[("jql", jql), ("maxResults", &SEARCH_LIMIT.to_string())]),
        )
        .await?;
        Ok(body
            .get("issues")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

fn parse_jira_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn severity_from(fields: &Value) -> Severity {
    match fields
        .get("priority")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "highest" | "blocker" => Severity::Critical,
        "high" => Severity::High,
        "medium" => Severity::Medium,
        _ => Severity::Low,
    }
}

fn status_from(fields: &Value) -> IncidentStatus {
    let name = fields
        .get("status")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    if ["done", "resolved", "closed"].contains(&name.as_str()) {
        IncidentStatus::Resolved
    } else if name.contains("progress") || name.contains("review") {
        IncidentStatus::Investigating
    } else {
        IncidentStatus::Open
    }
}

fn status_names(status: IncidentStatus) -> &'static [&'static str] {
    match status {
        IncidentStatus::Open => &["To Do", "Open", "Backlog"],
        IncidentStatus::Investigating => &["In Progress"],
        IncidentStatus::Resolved => &["Done", "Resolved", "Closed"],
    }
}

fn incident_from_issue(issue: &Value) -> Incident {
    let empty = json!({});
    let fields = issue.get("fields").unwrap_or(&empty);
    let components = fields
        .get("components")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Incident {
        id: str_field(issue, "key").to_string(),
        title: str_field(fields, "summary").to_string(),
        description: str_field(fields, "description").to_string(),
        severity: severity_from(fields),
        status: status_from(fields),
        created_at: parse_jira_instant(str_field(fields, "created")).unwrap_or_else(Utc::now),
        updated_at: parse_jira_instant(str_field(fields, "updated")),
        affected_services: components,
        assignee: fields
            .get("assignee")
            .and_then(|a| a.get("displayName"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn resolution_of(issue: &Value) -> Option<String> {
    let resolution = issue.get("fields")?.get("resolution")?;
    let text = resolution
        .get("description")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| resolution.get("name").and_then(Value::as_str))?;
    Some(text.to_string())
}

#[async_trait]
impl IncidentConnector for JiraConnector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn list_incidents(&self) -> Result<Vec<Incident>, EngineError> {
        let issues = self
            .search_issues(&format!("{} ORDER BY created DESC", self.jql_scope()))
            .await?;
        Ok(issues.iter().map(incident_from_issue).collect())
    }

    async fn get_incident(&self, id: &str) -> Result<Incident, EngineError> {
        let url = format!("{}/rest/api/2/issue/{}", self.base_url, id);
        let issue = http::request_json(
            "jira get issue",
            self.client
                .get(url)
                .basic_auth(&self.email, Some(&self.api_token)),
        )
        .await
        .map_err(|e| match e {
            EngineError::Upstream(message) if message.contains("status 404") => {
                EngineError::NotFound(format!("incident {id}"))
            }
            other => other,
        })?;
        Ok(incident_from_issue(&issue))
    }

    async fn update_status(
        &self,
        id: &str,
        status: IncidentStatus,
    ) -> Result<Incident, EngineError> {
        let transitions_url = format!("{}/rest/api/2/issue/{}/transitions", self.base_url, id);
        let body = http::request_json(
            "jira list transitions",
            self.client
                .get(&transitions_url)
                .basic_auth(&self.email, Some(&self.api_token)),
        )
        .await?;
        let wanted = status_names(status);
        let transition_id = body
            .get("transitions")
            .and_then(Value::as_array)
            .and_then(|transitions| {
                transitions.iter().find(|t| {
                    let to = t
                        .get("to")
                        .and_then(|to| to.get("name"))
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    wanted.iter().any(|w| w.eq_ignore_ascii_case(to))
                })
            })
            .and_then(|t| t.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| {
                EngineError::Conflict(format!("no jira transition to {status} for {id}"))
            })?;

        // Transition endpoint returns 204 with no body; go through send directly.
        let response = self
            .client
            .post(&transitions_url)
            .basic_auth(&self.email, Some(&self.api_token))
            .json(&json!({ "transition": { "id": transition_id } }))
            .send()
            .await
            .map_err(|e| EngineError::Upstream(format!("jira transition: {}", e.without_url())))?;
        if !response.status().is_success() {
            return Err(EngineError::Upstream(format!(
                "jira transition: status {}",
                response.status().as_u16()
            )));
        }
        self.get_incident(id).await
    }

    async fn find_similar(
        &self,
        incident: &Incident,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SimilarIncidentMatch>, EngineError> {
        let issues = self
            .search_issues(&format!(
                "{} AND statusCategory = Done ORDER BY created DESC",
                self.jql_scope()
            ))
            .await?;
        let mut matches: Vec<SimilarIncidentMatch> = issues
            .iter()
            .map(|issue| (incident_from_issue(issue), resolution_of(issue)))
            .filter(|(candidate, _)| candidate.id != incident.id)
            .filter_map(|(candidate, resolution)| {
                let score = similarity::incident_similarity(incident, &candidate);
                (score >= threshold).then(|| {
                    let ticket = resolution.map(|resolution| Ticket {
                        ticket_id: candidate.id.clone(),
                        incident_id: candidate.id.clone(),
                        kind: TicketKind::SimilarIncident,
                        resolution: Some(resolution),
                        description: Some(candidate.description.clone()),
                        source: SOURCE.to_string(),
                    });
                    SimilarIncidentMatch {
                        incident: candidate,
                        ticket,
                        similarity_score: score,
                    }
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
        _window: ChangeWindow,
    ) -> Result<Vec<ScoredChange>, EngineError> {
        debug!(incident = %incident.id, "jira has no deployment records");
        Ok(Vec::new())
    }

    async fn find_logs(&self, incident: &Incident) -> Result<Vec<LogEntry>, EngineError> {
        debug!(incident = %incident.id, "jira has no log retrieval");
        Err(EngineError::NotSupported("jira log retrieval".to_string()))
    }

    async fn find_events(&self, incident: &Incident) -> Result<Vec<EventRecord>, EngineError> {
        debug!(incident = %incident.id, "jira has no event retrieval");
        Err(EngineError::NotSupported("jira event retrieval".to_string()))
    }
}
