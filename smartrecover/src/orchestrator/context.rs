//! Deterministic text rendering of gathered evidence.
//!
//! Shared by blocking synthesis and streaming chat, so both see the same
//! picture. Section order is fixed: top-suspect change, similar incidents,
//! previous resolutions, knowledge articles, logs, events, summary counts.
//! Empty sections are omitted.

use crate::model::{AgentData, EntryLevel, Incident};

/// Log/event entries carried into the context.
const MAX_ITEMS: usize = 5;
/// Characters of article content quoted per knowledge entry.
const SNIPPET_CHARS: usize = 200;

fn level_str(level: EntryLevel) -> &'static str {
    match level {
        EntryLevel::Debug => "DEBUG",
        EntryLevel::Info => "INFO",
        EntryLevel::Warning => "WARNING",
        EntryLevel::Error => "ERROR",
        EntryLevel::Critical => "CRITICAL",
    }
}

fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        flat
    } else {
        flat.chars().take(SNIPPET_CHARS).collect()
    }
}

/// Renders the (already exclusion-filtered) evidence for one incident.
/// `max_items` caps the similar-incident and knowledge sections.
pub fn render_context(incident: &Incident, data: &AgentData, max_items: usize) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!(
        "Incident {}: {} (severity {:?}, status {})\n{}",
        incident.id,
        incident.title,
        incident.severity,
        incident.status,
        incident.description,
    ));

    if let Some(top) = data
        .change_results
        .as_ref()
        .and_then(|r| r.top_suspect.as_ref())
    {
        sections.push(format!(
            "Top suspect change:\n- {} (correlation {:.2}): {} (deployed {})",
            top.change.change_id,
            top.correlation_score,
            top.change.description,
            top.change.deployed_at.to_rfc3339(),
        ));
    }

    if let Some(results) = &data.servicenow_results {
        if !results.similar_incidents.is_empty() {
            let mut lines = vec!["Similar historical incidents:".to_string()];
            for entry in results.similar_incidents.iter().take(max_items) {
                lines.push(format!(
                    "- {} (similarity {:.2}, {}): {}",
                    entry.incident_id, entry.similarity_score, entry.status, entry.title,
                ));
            }
            sections.push(lines.join("\n"));
        }
        if !results.resolutions.is_empty() {
            let mut lines = vec!["Previous resolutions:".to_string()];
            for resolution in results.resolutions.iter().take(max_items) {
                lines.push(format!("- {resolution}"));
            }
            sections.push(lines.join("\n"));
        }
    }

    if let Some(results) = &data.confluence_results {
        if !results.documents.is_empty() {
            let mut lines = vec!["Relevant knowledge articles:".to_string()];
            for doc in results.documents.iter().take(max_items) {
                lines.push(format!("- {}: {}", doc.title, snippet(&doc.content)));
            }
            sections.push(lines.join("\n"));
        }
    }

    if let Some(results) = &data.logs_results {
        if !results.logs.is_empty() {
            let mut lines = vec!["Recent log entries:".to_string()];
            for log in results.logs.iter().take(MAX_ITEMS) {
                lines.push(format!(
                    "- [{}] {}: {} (confidence {:.2})",
                    level_str(log.level),
                    log.service,
                    log.message,
                    log.confidence_score,
                ));
            }
            sections.push(lines.join("\n"));
        }
    }

    if let Some(results) = &data.events_results {
        if !results.events.is_empty() {
            let mut lines = vec!["Recent events:".to_string()];
            for event in results.events.iter().take(MAX_ITEMS) {
                lines.push(format!(
                    "- [{}] {}/{}: {} (confidence {:.2})",
                    level_str(event.severity),
                    event.application,
                    event.event_type,
                    event.message,
                    event.confidence_score,
                ));
            }
            sections.push(lines.join("\n"));
        }
    }

    let mut counts: Vec<String> = Vec::new();
    if let Some(r) = &data.servicenow_results {
        counts.push(format!("similar_incidents={}", r.similar_incidents.len()));
    }
    if let Some(r) = &data.confluence_results {
        counts.push(format!("knowledge_documents={}", r.documents.len()));
    }
    if let Some(r) = &data.change_results {
        counts.push(format!("changes={}", r.all_correlations.len()));
    }
    if let Some(r) = &data.logs_results {
        counts.push(format!("logs={} (errors={})", r.total_count, r.error_count));
    }
    if let Some(r) = &data.events_results {
        counts.push(format!(
            "events={} (critical={})",
            r.total_count, r.critical_count
        ));
    }
    if !counts.is_empty() {
        sections.push(format!("Summary counts: {}", counts.join(", ")));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ChangeRecord, ChangeResults, CorrelatedChange, IncidentStatus, LogEntry, LogsResults,
        ServiceNowResults, Severity, SimilarIncidentEntry,
    };
    use chrono::{TimeZone, Utc};

    fn incident() -> Incident {
        Incident {
            id: "INC001".to_string(),
            title: "Checkout gateway latency".to_string(),
            description: "payment gateway errors after deploy".to_string(),
            severity: Severity::High,
            status: IncidentStatus::Open,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            updated_at: None,
            affected_services: vec!["checkout".to_string()],
            assignee: None,
        }
    }

    fn full_data() -> AgentData {
        AgentData {
            servicenow_results: Some(ServiceNowResults {
                source: "mock".to_string(),
                incident_id: "INC001".to_string(),
                similar_incidents: vec![SimilarIncidentEntry {
                    incident_id: "INC007".to_string(),
                    title: "Checkout latency spike".to_string(),
                    similarity_score: 0.73,
                    status: IncidentStatus::Resolved,
                    description: Some("gateway pool exhausted".to_string()),
                    resolution: Some("scaled out the pool".to_string()),
                    source: "mock".to_string(),
                }],
                quality_assessment: None,
                resolutions: vec!["scaled out the pool".to_string()],
            }),
            change_results: Some(ChangeResults::from_correlations(
                "mock",
                "INC001",
                vec![CorrelatedChange {
                    change: ChangeRecord {
                        change_id: "CHG005".to_string(),
                        description: "Deployed payment gateway 2.3".to_string(),
                        deployed_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
                        service: Some("checkout".to_string()),
                    },
                    correlation_score: 0.88,
                }],
            )),
            logs_results: Some(LogsResults {
                source: "mock".to_string(),
                incident_id: "INC001".to_string(),
                logs: vec![LogEntry {
                    id: "LOG-1".to_string(),
                    timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 55, 0).unwrap(),
                    level: EntryLevel::Error,
                    service: "checkout".to_string(),
                    message: "connection pool exhausted".to_string(),
                    confidence_score: 0.9,
                }],
                total_count: 1,
                error_count: 1,
                warning_count: 0,
            }),
            ..AgentData::default()
        }
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let context = render_context(&incident(), &full_data(), 5);
        let top = context.find("Top suspect change:").unwrap();
        let similar = context.find("Similar historical incidents:").unwrap();
        let resolutions = context.find("Previous resolutions:").unwrap();
        let logs = context.find("Recent log entries:").unwrap();
        let counts = context.find("Summary counts:").unwrap();
        assert!(top < similar && similar < resolutions && resolutions < logs && logs < counts);
        assert!(context.contains("CHG005"));
        assert!(context.contains("INC007"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let context = render_context(&incident(), &AgentData::default(), 5);
        assert!(!context.contains("Top suspect change:"));
        assert!(!context.contains("Recent events:"));
        assert!(!context.contains("Summary counts:"));
        assert!(context.contains("INC001"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = render_context(&incident(), &full_data(), 5);
        let b = render_context(&incident(), &full_data(), 5);
        assert_eq!(a, b);
    }

    #[test]
    fn excluded_change_never_renders() {
        let mut data = full_data();
        data.change_results = Some(ChangeResults::from_correlations(
            "mock",
            "INC001",
            Vec::new(),
        ));
        let context = render_context(&incident(), &data, 5);
        assert!(!context.contains("CHG005"));
    }
}
