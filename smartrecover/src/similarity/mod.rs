//! Text tokenization and weighted-Jaccard similarity.
//!
//! The blend used for incident-to-incident matching: title tokens 0.4,
//! description tokens 0.4, affected-service sets 0.2. The same tokenizer
//! feeds knowledge-base ranking and change-description overlap so the
//! scores stay comparable across agents.

use std::collections::BTreeSet;

use crate::model::Incident;

/// Weight of title-token overlap in the incident similarity blend.
pub const TITLE_WEIGHT: f64 = 0.4;
/// Weight of description-token overlap.
pub const DESCRIPTION_WEIGHT: f64 = 0.4;
/// Weight of affected-service overlap.
pub const SERVICES_WEIGHT: f64 = 0.2;

/// Fixed English stopword set dropped during tokenization.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "been", "being", "with", "that", "this", "these",
    "those", "from", "into", "onto", "has", "have", "had", "but", "not", "all", "any", "can",
    "could", "will", "would", "should", "may", "might", "its", "our", "out", "who", "what",
    "when", "where", "which", "while", "after", "before", "during", "about", "above", "below",
    "between", "under", "over", "then", "than", "there", "here", "how", "why", "did", "does",
    "doing", "due", "per", "via", "you", "your",
];

/// Lowercases, splits on non-alphanumeric boundaries, drops stopwords and
/// tokens shorter than three characters.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .filter(|t| !STOPWORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

/// Jaccard index of two sets; 0.0 when both are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Normalizes a service set for overlap comparison (lowercased names; order
/// is not significant).
pub fn service_set(services: &[String]) -> BTreeSet<String> {
    services.iter().map(|s| s.to_lowercase()).collect()
}

/// Weighted-Jaccard similarity of two incidents in [0, 1].
///
/// Two incidents with identical title tokens, description tokens, and
/// affected services score exactly 1.0.
pub fn incident_similarity(a: &Incident, b: &Incident) -> f64 {
    let title = jaccard(&tokenize(&a.title), &tokenize(&b.title));
    let description = jaccard(&tokenize(&a.description), &tokenize(&b.description));
    let services = jaccard(&service_set(&a.affected_services), &service_set(&b.affected_services));
    TITLE_WEIGHT * title + DESCRIPTION_WEIGHT * description + SERVICES_WEIGHT * services
}

/// Keyword overlap between incident text and an arbitrary document: the
/// Jaccard index of the token sets.
pub fn keyword_overlap(query: &BTreeSet<String>, text: &str) -> f64 {
    jaccard(query, &tokenize(text))
}

/// Tokens describing an incident: title plus description.
pub fn incident_tokens(incident: &Incident) -> BTreeSet<String> {
    let mut tokens = tokenize(&incident.title);
    tokens.extend(tokenize(&incident.description));
    tokens
}
