//! Quality assessment for similar-incident results.
//!
//! Each ticket-shaped entry earns 0.5 for a substantive description and 0.5
//! for a substantive resolution ("substantive" means at least the
//! configured minimum length, default 20 characters). Scores map to levels:
//! good (≥ 0.8), warning (≥ 0.5), poor otherwise.

use serde::{Deserialize, Serialize};

use crate::model::SimilarIncidentEntry;

/// Thresholds for the assessment; defaults match the engine-wide settings.
#[derive(Debug, Clone, Copy)]
pub struct QualityThresholds {
    pub min_text_len: usize,
    pub good: f64,
    pub warning: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_text_len: 20,
            good: 0.8,
            warning: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Good,
    Warning,
    Poor,
}

/// Assessment of a single entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketQuality {
    pub incident_id: String,
    pub score: f64,
    pub level: QualityLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Aggregate assessment across one agent result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub tickets: Vec<TicketQuality>,
    pub average_score: f64,
    pub good_count: usize,
    pub warning_count: usize,
    pub poor_count: usize,
}

fn substantive(text: Option<&str>, min_len: usize) -> bool {
    text.map(|t| t.trim().len() >= min_len).unwrap_or(false)
}

/// Scores one similar-incident entry in [0, 1] and names what is missing.
pub fn assess_entry(entry: &SimilarIncidentEntry, thresholds: QualityThresholds) -> TicketQuality {
    let mut score = 0.0;
    let mut issues = Vec::new();

    if substantive(entry.description.as_deref(), thresholds.min_text_len) {
        score += 0.5;
    } else if entry.description.is_none() {
        issues.push("missing description".to_string());
    } else {
        issues.push("description too short".to_string());
    }

    if substantive(entry.resolution.as_deref(), thresholds.min_text_len) {
        score += 0.5;
    } else if entry.resolution.is_none() {
        issues.push("missing resolution".to_string());
    } else {
        issues.push("resolution too short".to_string());
    }

    let level = if score >= thresholds.good {
        QualityLevel::Good
    } else if score >= thresholds.warning {
        QualityLevel::Warning
    } else {
        QualityLevel::Poor
    };

    TicketQuality {
        incident_id: entry.incident_id.clone(),
        score,
        level,
        issues,
    }
}

/// Assesses a whole result set; `None` when there is nothing to assess.
pub fn assess(
    entries: &[SimilarIncidentEntry],
    thresholds: QualityThresholds,
) -> Option<QualityAssessment> {
    if entries.is_empty() {
        return None;
    }
    let tickets: Vec<TicketQuality> = entries
        .iter()
        .map(|e| assess_entry(e, thresholds))
        .collect();
    let average_score = tickets.iter().map(|t| t.score).sum::<f64>() / tickets.len() as f64;
    let good_count = tickets.iter().filter(|t| t.level == QualityLevel::Good).count();
    let warning_count = tickets
        .iter()
        .filter(|t| t.level == QualityLevel::Warning)
        .count();
    let poor_count = tickets.iter().filter(|t| t.level == QualityLevel::Poor).count();
    Some(QualityAssessment {
        tickets,
        average_score,
        good_count,
        warning_count,
        poor_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IncidentStatus;

    fn entry(description: Option<&str>, resolution: Option<&str>) -> SimilarIncidentEntry {
        SimilarIncidentEntry {
            incident_id: "INC007".to_string(),
            title: "Past incident".to_string(),
            similarity_score: 0.7,
            status: IncidentStatus::Resolved,
            description: description.map(str::to_string),
            resolution: resolution.map(str::to_string),
            source: "mock".to_string(),
        }
    }

    #[test]
    fn full_entry_is_good() {
        let q = assess_entry(
            &entry(
                Some("payment gateway connection pool exhausted"),
                Some("increased pool size and restarted workers"),
            ),
            QualityThresholds::default(),
        );
        assert_eq!(q.score, 1.0);
        assert_eq!(q.level, QualityLevel::Good);
        assert!(q.issues.is_empty());
    }

    #[test]
    fn missing_resolution_is_warning_with_issue() {
        let q = assess_entry(
            &entry(Some("payment gateway connection pool exhausted"), None),
            QualityThresholds::default(),
        );
        assert_eq!(q.score, 0.5);
        assert_eq!(q.level, QualityLevel::Warning);
        assert_eq!(q.issues, vec!["missing resolution".to_string()]);
    }

    #[test]
    fn short_texts_earn_nothing() {
        let q = assess_entry(&entry(Some("short"), Some("tiny")), QualityThresholds::default());
        assert_eq!(q.score, 0.0);
        assert_eq!(q.level, QualityLevel::Poor);
        assert_eq!(q.issues.len(), 2);
    }

    #[test]
    fn aggregate_reports_average_and_counts() {
        let entries = vec![
            entry(
                Some("payment gateway connection pool exhausted"),
                Some("increased pool size and restarted workers"),
            ),
            entry(Some("payment gateway connection pool exhausted"), None),
        ];
        let assessment = assess(&entries, QualityThresholds::default()).unwrap();
        assert!((assessment.average_score - 0.75).abs() < 1e-9);
        assert_eq!(assessment.good_count, 1);
        assert_eq!(assessment.warning_count, 1);
        assert_eq!(assessment.poor_count, 0);
    }

    #[test]
    fn empty_input_yields_no_assessment() {
        assert!(assess(&[], QualityThresholds::default()).is_none());
    }
}
