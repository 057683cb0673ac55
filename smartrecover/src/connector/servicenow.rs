//! ServiceNow incident connector (Table API, basic auth).
//!
//! Incidents map from the `incident` table, changes from `change_request`.
//! Log and event retrieval are not supported by this backend; the agents
//! degrade to empty results.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Value};
use tracing::debug;

use crate::connector::http::{self, nested_str, str_field};
use crate::connector::{ChangeWindow, IncidentConnector, ScoredChange, SimilarIncidentMatch};
use crate::error::EngineError;
use crate::model::{
    ChangeRecord, EventRecord, Incident, IncidentStatus, LogEntry, Severity, Ticket, TicketKind,
};
use crate::similarity;

const SOURCE: &str = "servicenow";
const LIST_LIMIT: usize = 200;

pub struct ServiceNowConnector {
    client: reqwest::Client,
    instance_url: String,
    username: String,
    password: String,
}

impl ServiceNowConnector {
    pub fn new(
        instance_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            client: http::client(timeout)?,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/api/now/table/{}", self.instance_url, table)
    }

    fn get(&self, url: String, query: &[(&str, String)]) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .query(query)
    }

    async fn fetch_incidents(&self, sysparm_query: Option<&str>) -> Result<Vec<Value>, EngineError> {
        let mut query = vec![("sysparm_limit", LIST_LIMIT.to_string())];
        if let Some(q) = sysparm_query {
            query.push(("sysparm_query", q.to_string()));
        }
        let body = http::request_json(
            "servicenow list incidents",
            self.get(self.table_url("incident"), &query),
        )
        .await?;
        Ok(body
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Looks up the `sys_id` behind an incident number (writes go by sys_id).
    async fn sys_id_of(&self, number: &str) -> Result<String, EngineError> {
        let rows = self
            .fetch_incidents(Some(&format!("number={number}")))
            .await?;
        rows.first()
            .map(|row| str_field(row, "sys_id").to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EngineError::NotFound(format!("incident {number}")))
    }
}

fn parse_sn_instant(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}

fn severity_from(row: &Value) -> Severity {
    match str_field(row, "severity") {
        "1" => Severity::Critical,
        "2" => Severity::High,
        "3" => Severity::Medium,
        _ => Severity::Low,
    }
}

fn status_from(row: &Value) -> IncidentStatus {
    match str_field(row, "state") {
        "6" | "7" => IncidentStatus::Resolved,
        "2" | "3" => IncidentStatus::Investigating,
        _ => IncidentStatus::Open,
    }
}

fn status_to_state(status: IncidentStatus) -> &'static str {
    match status {
        IncidentStatus::Open => "1",
        IncidentStatus::Investigating => "2",
        IncidentStatus::Resolved => "6",
    }
}

fn incident_from_row(row: &Value) -> Incident {
    let service = nested_str(row, "cmdb_ci", "display_value");
    Incident {
        id: str_field(row, "number").to_string(),
        title: str_field(row, "short_description").to_string(),
        description: str_field(row, "description").to_string(),
        severity: severity_from(row),
        status: status_from(row),
        created_at: parse_sn_instant(str_field(row, "sys_created_on")).unwrap_or_else(Utc::now),
        updated_at: parse_sn_instant(str_field(row, "sys_updated_on")),
        affected_services: if service.is_empty() {
            Vec::new()
        } else {
            vec![service.to_string()]
        },
        assignee: {
            let name = nested_str(row, "assigned_to", "display_value");
            (!name.is_empty()).then(|| name.to_string())
        },
    }
}

#[async_trait]
impl IncidentConnector for ServiceNowConnector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn list_incidents(&self) -> Result<Vec<Incident>, EngineError> {
        Ok(self
            .fetch_incidents(None)
            .await?
            .iter()
            .map(incident_from_row)
            .collect())
    }

    async fn get_incident(&self, id: &str) -> Result<Incident, EngineError> {
        let rows = self.fetch_incidents(Some(&format!("number={id}"))).await?;
        rows.first()
            .map(incident_from_row)
            .ok_or_else(|| EngineError::NotFound(format!("incident {id}")))
    }

    async fn update_status(
        &self,
        id: &str,
        status: IncidentStatus,
    ) -> Result<Incident, EngineError> {
        let sys_id = self.sys_id_of(id).await?;
        let url = format!("{}/{}", self.table_url("incident"), sys_id);
        let body = http::request_json(
            "servicenow update status",
            self.client
                .patch(url)
                .basic_auth(&self.username, Some(&self.password))
                .json(&json!({ "state": status_to_state(status) })),
        )
        .await?;
        let row = body
            .get("result")
            .ok_or_else(|| EngineError::Upstream("servicenow update: empty result".to_string()))?;
        Ok(incident_from_row(row))
    }

    async fn find_similar(
        &self,
        incident: &Incident,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SimilarIncidentMatch>, EngineError> {
        let rows = self.fetch_incidents(Some("stateIN6,7")).await?;
        let mut matches: Vec<SimilarIncidentMatch> = rows
            .iter()
            .map(|row| (incident_from_row(row), str_field(row, "close_notes").to_string()))
            .filter(|(candidate, _)| candidate.id != incident.id)
            .filter_map(|(candidate, close_notes)| {
                let score = similarity::incident_similarity(incident, &candidate);
                (score >= threshold).then(|| {
                    let ticket = (!close_notes.is_empty()).then(|| Ticket {
                        ticket_id: candidate.id.clone(),
                        incident_id: candidate.id.clone(),
                        kind: TicketKind::SimilarIncident,
                        resolution: Some(close_notes),
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
        window: ChangeWindow,
    ) -> Result<Vec<ScoredChange>, EngineError> {
        let body = http::request_json(
            "servicenow list changes",
            self.get(
                self.table_url("change_request"),
                &[("sysparm_limit", LIST_LIMIT.to_string())],
            ),
        )
        .await?;
        let rows = body
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .iter()
            .filter_map(|row| {
                let deployed_at = parse_sn_instant(str_field(row, "work_start"))
                    .or_else(|| parse_sn_instant(str_field(row, "sys_created_on")))?;
                window
                    .contains(incident.created_at, deployed_at)
                    .then(|| {
                        let service = nested_str(row, "cmdb_ci", "display_value");
                        ScoredChange {
                            change: ChangeRecord {
                                change_id: str_field(row, "number").to_string(),
                                description: str_field(row, "short_description").to_string(),
                                deployed_at,
                                service: (!service.is_empty()).then(|| service.to_string()),
                            },
                            connector_score: None,
                        }
                    })
            })
            .collect())
    }

    async fn find_logs(&self, incident: &Incident) -> Result<Vec<LogEntry>, EngineError> {
        debug!(incident = %incident.id, "servicenow has no log retrieval");
        Err(EngineError::NotSupported(
            "servicenow log retrieval".to_string(),
        ))
    }

    async fn find_events(&self, incident: &Incident) -> Result<Vec<EventRecord>, EngineError> {
        debug!(incident = %incident.id, "servicenow has no event retrieval");
        Err(EngineError::NotSupported(
            "servicenow event retrieval".to_string(),
        ))
    }
}
