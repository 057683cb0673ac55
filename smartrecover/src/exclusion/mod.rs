//! Per-incident excluded items and accuracy metrics.
//!
//! Exclusions are `(item_id, kind, source)` triples; filtering matches on
//! `item_id` and runs on every read path, so an excluded item never appears
//! in a returned result or an LLM context. Accuracy per category:
//! `100 × (returned − excluded) / max(returned, 1)`, with `returned` a
//! monotonic counter and `excluded` a distinct-id set.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{AgentData, ChangeResults, ExcludedItem};
use crate::quality::{self, QualityThresholds};

/// Accuracy categories, in reporting order.
pub const CATEGORIES: &[&str] = &[
    "similar_incidents",
    "knowledge_documents",
    "changes",
    "logs",
    "events",
];

/// Maps a free-form exclusion `kind` onto its accuracy category.
fn category_for_kind(kind: &str) -> Option<&'static str> {
    match kind.to_lowercase().as_str() {
        "similar_incident" | "similar_incidents" | "incident" => Some("similar_incidents"),
        "document" | "documents" | "knowledge" | "knowledge_document" | "knowledge_documents" => {
            Some("knowledge_documents")
        }
        "change" | "changes" => Some("changes"),
        "log" | "logs" => Some("logs"),
        "event" | "events" => Some("events"),
        _ => None,
    }
}

#[derive(Default)]
struct CategoryCounter {
    returned: u64,
    excluded_ids: HashSet<String>,
}

/// Per-category accuracy as reported by the admin endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAccuracy {
    pub returned: u64,
    pub excluded: u64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub categories: BTreeMap<String, CategoryAccuracy>,
    pub overall_accuracy: f64,
}

/// Store of excluded items plus the accuracy counters.
pub struct ExclusionStore {
    excluded: Mutex<HashMap<String, HashSet<ExcludedItem>>>,
    counters: Mutex<BTreeMap<&'static str, CategoryCounter>>,
}

impl Default for ExclusionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusionStore {
    pub fn new() -> Self {
        Self {
            excluded: Mutex::new(HashMap::new()),
            counters: Mutex::new(
                CATEGORIES
                    .iter()
                    .map(|&c| (c, CategoryCounter::default()))
                    .collect(),
            ),
        }
    }

    /// Excludes an item for an incident. Returns false when the triple was
    /// already present.
    pub fn add(&self, incident_id: &str, item: ExcludedItem) -> bool {
        let category = category_for_kind(&item.kind);
        if category.is_none() {
            warn!(kind = %item.kind, "exclusion kind outside known categories");
        }
        let newly_added = match self.excluded.lock() {
            Ok(mut excluded) => excluded
                .entry(incident_id.to_string())
                .or_default()
                .insert(item.clone()),
            Err(_) => false,
        };
        if let (Some(category), Ok(mut counters)) = (category, self.counters.lock()) {
            counters
                .entry(category)
                .or_default()
                .excluded_ids
                .insert(item.item_id.clone());
        }
        newly_added
    }

    /// Removes every exclusion of `item_id` for the incident. The accuracy
    /// counters keep the id: `excluded` counts items ever excluded.
    pub fn remove(&self, incident_id: &str, item_id: &str) -> bool {
        let Ok(mut excluded) = self.excluded.lock() else {
            return false;
        };
        let Some(items) = excluded.get_mut(incident_id) else {
            return false;
        };
        let before = items.len();
        items.retain(|item| item.item_id != item_id);
        before != items.len()
    }

    /// Excluded items for an incident, ordered by item id.
    pub fn list(&self, incident_id: &str) -> Vec<ExcludedItem> {
        let mut items: Vec<ExcludedItem> = self
            .excluded
            .lock()
            .ok()
            .and_then(|excluded| excluded.get(incident_id).cloned())
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        items.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        items
    }

    /// Item ids excluded for an incident, for filtering.
    pub fn excluded_ids(&self, incident_id: &str) -> HashSet<String> {
        self.list(incident_id)
            .into_iter()
            .map(|item| item.item_id)
            .collect()
    }

    /// Bumps the `returned` counters for everything in a freshly retrieved
    /// result set.
    pub fn record_returned(&self, data: &AgentData) {
        let Ok(mut counters) = self.counters.lock() else {
            return;
        };
        let mut bump = |category: &'static str, count: usize| {
            counters.entry(category).or_default().returned += count as u64;
        };
        if let Some(results) = &data.servicenow_results {
            bump("similar_incidents", results.similar_incidents.len());
        }
        if let Some(results) = &data.confluence_results {
            bump("knowledge_documents", results.documents.len());
        }
        if let Some(results) = &data.change_results {
            bump("changes", results.all_correlations.len());
        }
        if let Some(results) = &data.logs_results {
            bump("logs", results.logs.len());
        }
        if let Some(results) = &data.events_results {
            bump("events", results.events.len());
        }
    }

    /// Current accuracy metrics. Overall accuracy weights categories by
    /// their `returned` counts.
    pub fn metrics(&self) -> AccuracyMetrics {
        let counters = match self.counters.lock() {
            Ok(counters) => counters,
            Err(_) => {
                return AccuracyMetrics {
                    categories: BTreeMap::new(),
                    overall_accuracy: 100.0,
                }
            }
        };
        let mut categories = BTreeMap::new();
        let mut total_returned: u64 = 0;
        let mut total_kept: u64 = 0;
        for &category in CATEGORIES {
            let counter = counters.get(category);
            let returned = counter.map(|c| c.returned).unwrap_or(0);
            let excluded = counter.map(|c| c.excluded_ids.len() as u64).unwrap_or(0);
            let kept = returned.saturating_sub(excluded);
            let accuracy = 100.0 * kept as f64 / returned.max(1) as f64;
            total_returned += returned;
            total_kept += kept;
            categories.insert(
                category.to_string(),
                CategoryAccuracy {
                    returned,
                    excluded,
                    accuracy,
                },
            );
        }
        let overall_accuracy = if total_returned == 0 {
            100.0
        } else {
            100.0 * total_kept as f64 / total_returned as f64
        };
        AccuracyMetrics {
            categories,
            overall_accuracy,
        }
    }
}

/// Removes excluded items from every result slot. Change partitions are
/// rebuilt so the next-highest change can take over as top suspect; the
/// quality assessment is recomputed over the surviving entries.
pub fn apply_exclusions(
    mut data: AgentData,
    excluded_ids: &HashSet<String>,
    thresholds: QualityThresholds,
) -> AgentData {
    if excluded_ids.is_empty() {
        return data;
    }

    if let Some(results) = &mut data.servicenow_results {
        results
            .similar_incidents
            .retain(|entry| !excluded_ids.contains(&entry.incident_id));
        results.resolutions = results
            .similar_incidents
            .iter()
            .filter_map(|entry| entry.resolution.clone())
            .collect();
        results.quality_assessment = quality::assess(&results.similar_incidents, thresholds);
    }

    if let Some(results) = &mut data.confluence_results {
        results
            .documents
            .retain(|doc| !excluded_ids.contains(&doc.doc_id));
        results.knowledge_base_articles =
            results.documents.iter().map(|d| d.title.clone()).collect();
    }

    if let Some(results) = &mut data.change_results {
        let remaining: Vec<_> = results
            .all_correlations
            .iter()
            .filter(|c| !excluded_ids.contains(&c.change.change_id))
            .cloned()
            .collect();
        *results = ChangeResults::from_correlations(
            results.source.clone(),
            results.incident_id.clone(),
            remaining,
        );
    }

    if let Some(results) = &mut data.logs_results {
        results.logs.retain(|log| !excluded_ids.contains(&log.id));
        results.total_count = results.logs.len();
        results.error_count = results
            .logs
            .iter()
            .filter(|l| matches!(l.level, crate::model::EntryLevel::Error | crate::model::EntryLevel::Critical))
            .count();
        results.warning_count = results
            .logs
            .iter()
            .filter(|l| l.level == crate::model::EntryLevel::Warning)
            .count();
    }

    if let Some(results) = &mut data.events_results {
        results
            .events
            .retain(|event| !excluded_ids.contains(&event.id));
        results.total_count = results.events.len();
        results.critical_count = results
            .events
            .iter()
            .filter(|e| e.severity == crate::model::EntryLevel::Critical)
            .count();
        results.warning_count = results
            .events
            .iter()
            .filter(|e| e.severity == crate::model::EntryLevel::Warning)
            .count();
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ChangeRecord, CorrelatedChange, IncidentStatus, ServiceNowResults, SimilarIncidentEntry,
    };
    use chrono::{TimeZone, Utc};

    fn excluded(item_id: &str, kind: &str) -> ExcludedItem {
        ExcludedItem {
            item_id: item_id.to_string(),
            kind: kind.to_string(),
            source: "mock".to_string(),
        }
    }

    fn change(id: &str, score: f64) -> CorrelatedChange {
        CorrelatedChange {
            change: ChangeRecord {
                change_id: id.to_string(),
                description: format!("change {id}"),
                deployed_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
                service: None,
            },
            correlation_score: score,
        }
    }

    #[test]
    fn add_is_idempotent_per_triple() {
        let store = ExclusionStore::new();
        assert!(store.add("INC001", excluded("CHG005", "change")));
        assert!(!store.add("INC001", excluded("CHG005", "change")));
        assert_eq!(store.list("INC001").len(), 1);
    }

    #[test]
    fn remove_deletes_only_that_item() {
        let store = ExclusionStore::new();
        store.add("INC001", excluded("CHG005", "change"));
        store.add("INC001", excluded("DOC1", "document"));
        assert!(store.remove("INC001", "CHG005"));
        assert!(!store.remove("INC001", "CHG005"));
        let remaining = store.list("INC001");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].item_id, "DOC1");
    }

    #[test]
    fn accuracy_tracks_returned_and_excluded() {
        let store = ExclusionStore::new();
        let data = AgentData {
            change_results: Some(ChangeResults::from_correlations(
                "mock",
                "INC001",
                vec![change("CHG1", 0.9), change("CHG2", 0.6)],
            )),
            ..AgentData::default()
        };
        store.record_returned(&data);
        store.add("INC001", excluded("CHG1", "change"));

        let metrics = store.metrics();
        let changes = &metrics.categories["changes"];
        assert_eq!(changes.returned, 2);
        assert_eq!(changes.excluded, 1);
        assert!((changes.accuracy - 50.0).abs() < 1e-9);
        assert!(metrics.overall_accuracy >= 0.0 && metrics.overall_accuracy <= 100.0);
    }

    #[test]
    fn excluding_same_item_twice_counts_once() {
        let store = ExclusionStore::new();
        store.add("INC001", excluded("CHG1", "change"));
        store.add("INC002", excluded("CHG1", "change"));
        assert_eq!(store.metrics().categories["changes"].excluded, 1);
    }

    #[test]
    fn filtering_promotes_next_top_suspect() {
        let data = AgentData {
            change_results: Some(ChangeResults::from_correlations(
                "mock",
                "INC001",
                vec![change("CHG005", 0.88), change("CHG009", 0.74)],
            )),
            ..AgentData::default()
        };
        let mut ids = HashSet::new();
        ids.insert("CHG005".to_string());
        let filtered = apply_exclusions(data, &ids, QualityThresholds::default());
        let results = filtered.change_results.unwrap();
        assert_eq!(
            results.top_suspect.map(|c| c.change.change_id),
            Some("CHG009".to_string())
        );
        assert!(results
            .all_correlations
            .iter()
            .all(|c| c.change.change_id != "CHG005"));
    }

    #[test]
    fn filtering_rebuilds_similar_incident_aggregates() {
        let data = AgentData {
            servicenow_results: Some(ServiceNowResults {
                source: "mock".to_string(),
                incident_id: "INC001".to_string(),
                similar_incidents: vec![
                    SimilarIncidentEntry {
                        incident_id: "INC007".to_string(),
                        title: "past".to_string(),
                        similarity_score: 0.7,
                        status: IncidentStatus::Resolved,
                        description: Some("payment gateway pool exhausted".to_string()),
                        resolution: Some("scaled out the worker pool".to_string()),
                        source: "mock".to_string(),
                    },
                    SimilarIncidentEntry {
                        incident_id: "INC011".to_string(),
                        title: "older".to_string(),
                        similarity_score: 0.3,
                        status: IncidentStatus::Resolved,
                        description: None,
                        resolution: Some("rotated credentials and restarted".to_string()),
                        source: "mock".to_string(),
                    },
                ],
                quality_assessment: None,
                resolutions: vec![
                    "scaled out the worker pool".to_string(),
                    "rotated credentials and restarted".to_string(),
                ],
            }),
            ..AgentData::default()
        };
        let mut ids = HashSet::new();
        ids.insert("INC011".to_string());
        let filtered = apply_exclusions(data, &ids, QualityThresholds::default());
        let results = filtered.servicenow_results.unwrap();
        assert_eq!(results.similar_incidents.len(), 1);
        assert_eq!(results.resolutions, vec!["scaled out the worker pool"]);
        assert!(results.quality_assessment.is_some());
    }

    #[test]
    fn empty_exclusions_leave_data_untouched() {
        let data = AgentData::default();
        let filtered = apply_exclusions(data, &HashSet::new(), QualityThresholds::default());
        assert!(filtered.is_empty());
    }
}
