//! Evidence-weighted confidence for resolve responses.
//!
//! Purely additive over evidence presence: base 0.2; +0.3 for a top-suspect
//! change with correlation ≥ 0.8; +0.2 for a similar resolved incident;
//! +0.15 for a knowledge document; +0.1 for an error-level log; +0.05 for a
//! critical event. Clamped to [0, 1].

use crate::model::{AgentData, EntryLevel, IncidentStatus};

const BASE: f64 = 0.2;
const STRONG_TOP_SUSPECT: f64 = 0.3;
const SIMILAR_RESOLVED: f64 = 0.2;
const KNOWLEDGE_DOC: f64 = 0.15;
const ERROR_LOG: f64 = 0.1;
const CRITICAL_EVENT: f64 = 0.05;

/// Confidence in [0, 1] for the given (filtered) evidence.
pub fn confidence_score(data: &AgentData) -> f64 {
    let mut score = BASE;

    if data
        .change_results
        .as_ref()
        .and_then(|r| r.top_suspect.as_ref())
        .map(|top| top.correlation_score >= 0.8)
        .unwrap_or(false)
    {
        score += STRONG_TOP_SUSPECT;
    }

    if data
        .servicenow_results
        .as_ref()
        .map(|r| {
            r.similar_incidents
                .iter()
                .any(|s| s.status == IncidentStatus::Resolved)
        })
        .unwrap_or(false)
    {
        score += SIMILAR_RESOLVED;
    }

    if data
        .confluence_results
        .as_ref()
        .map(|r| !r.documents.is_empty())
        .unwrap_or(false)
    {
        score += KNOWLEDGE_DOC;
    }

    if data
        .logs_results
        .as_ref()
        .map(|r| {
            r.logs
                .iter()
                .any(|l| matches!(l.level, EntryLevel::Error | EntryLevel::Critical))
        })
        .unwrap_or(false)
    {
        score += ERROR_LOG;
    }

    if data
        .events_results
        .as_ref()
        .map(|r| r.events.iter().any(|e| e.severity == EntryLevel::Critical))
        .unwrap_or(false)
    {
        score += CRITICAL_EVENT;
    }

    score.clamp(0.0, 1.0)
}
