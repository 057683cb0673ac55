//! Warning pass for unrecognized nested configuration keys.
//!
//! Top-level sections are a closed set (checked by the loader); nested keys
//! inside the open sections are forward-compatible: unknown ones are kept
//! out of the typed config but logged so typos surface.

use serde_yaml::{Mapping, Value};

const LLM_KEYS: &[&str] = &[
    "provider",
    "model",
    "temperature",
    "api_key",
    "base_url",
    "request_timeout_secs",
    "stream_idle_timeout_secs",
];
const LOGGING_KEYS: &[&str] = &["level", "enable_tracing", "file", "max_bytes", "backup_count"];
const CACHE_KEYS: &[&str] = &["ttl_seconds"];
const AGENTS_KEYS: &[&str] = &[
    "max_similar_incidents",
    "similarity_threshold",
    "max_knowledge_docs",
    "context_items",
    "change_window_days",
    "change_window_after_hours",
    "min_quality_text_len",
    "quality_good_threshold",
    "quality_warning_threshold",
    "connector_timeout_secs",
];
const PROMPT_LOGS_KEYS: &[&str] = &["max_entries"];

/// Warns about unknown keys nested under the open sections. Connector
/// sections are skipped here; their variants use closed key sets enforced
/// by serde.
pub(crate) fn warn_unknown_nested(root: &Mapping) {
    for (section, known) in [
        ("llm", LLM_KEYS),
        ("logging", LOGGING_KEYS),
        ("cache", CACHE_KEYS),
        ("agents", AGENTS_KEYS),
        ("prompt_logs", PROMPT_LOGS_KEYS),
    ] {
        let Some(Value::Mapping(map)) = root.get(section) else {
            continue;
        };
        for key in map.keys() {
            let name = key.as_str().unwrap_or_default();
            if !known.contains(&name) {
                tracing::warn!(section, key = name, "ignoring unknown config key");
            }
        }
    }
}
