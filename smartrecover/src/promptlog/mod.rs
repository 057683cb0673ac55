//! Bounded in-memory log of LLM invocations.
//!
//! Every completion and stream call appends one record before the provider
//! is hit; the ring drops the oldest record past the configured maximum, so
//! memory stays bounded and appending never blocks on I/O.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::ChatMessage;

/// Characters kept of the rendered context in each record.
const CONTEXT_SUMMARY_CHARS: usize = 200;

/// Which call produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    Synthesis,
    Chat,
}

/// One logged LLM invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub incident_id: String,
    pub prompt_type: PromptType,
    pub system_prompt: String,
    pub user_message: String,
    pub context_summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation_history: Vec<ChatMessage>,
}

impl PromptLogEntry {
    pub fn new(
        incident_id: impl Into<String>,
        prompt_type: PromptType,
        system_prompt: impl Into<String>,
        user_message: impl Into<String>,
        context_summary: impl Into<String>,
        conversation_history: Vec<ChatMessage>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            incident_id: incident_id.into(),
            prompt_type,
            system_prompt: system_prompt.into(),
            user_message: user_message.into(),
            context_summary: context_summary.into(),
            conversation_history,
        }
    }
}

/// First 200 characters of a rendered context, on a char boundary.
pub fn summarize_context(context: &str) -> String {
    context.chars().take(CONTEXT_SUMMARY_CHARS).collect()
}

/// The ring buffer. One mutex; appenders drop the oldest entry when full.
pub struct PromptLogStore {
    entries: Mutex<VecDeque<PromptLogEntry>>,
    max_entries: usize,
}

impl PromptLogStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Appends a record, evicting the oldest when the ring is full. Failure
    /// to log (poisoned lock) is non-fatal.
    pub fn append(&self, entry: PromptLogEntry) {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::warn!("prompt log lock poisoned; dropping record");
            return;
        };
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All records, oldest first.
    pub fn list(&self) -> Vec<PromptLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
