//! Editable per-agent system prompts with defaults and persistence.
//!
//! Reads serve from an in-memory map under one mutex; custom prompts
//! persist as a single JSON document written via temp-file + atomic rename,
//! so a crash mid-write never corrupts the store. Setting a prompt back to
//! its default clears the custom flag, and reset is idempotent.

pub(crate) mod defaults;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EngineError;

/// Prompt keys: the five agents plus the synthesis and chat prompts.
pub const PROMPT_AGENTS: &[&str] = &[
    "servicenow",
    "knowledge_base",
    "change_correlation",
    "logs",
    "events",
    "synthesis",
    "chat",
];

fn default_for(agent: &str) -> Option<&'static str> {
    match agent {
        "servicenow" => Some(defaults::SERVICENOW_PROMPT),
        "knowledge_base" => Some(defaults::KNOWLEDGE_BASE_PROMPT),
        "change_correlation" => Some(defaults::CHANGE_CORRELATION_PROMPT),
        "logs" => Some(defaults::LOGS_PROMPT),
        "events" => Some(defaults::EVENTS_PROMPT),
        "synthesis" => Some(defaults::SYNTHESIS_PROMPT),
        "chat" => Some(defaults::CHAT_PROMPT),
        _ => None,
    }
}

/// One prompt as exposed over the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptView {
    pub agent: String,
    pub default: String,
    pub current: String,
    pub is_custom: bool,
}

#[derive(Debug, Clone)]
struct PromptRecord {
    default: &'static str,
    current: String,
}

impl PromptRecord {
    fn is_custom(&self) -> bool {
        self.current != self.default
    }

    fn view(&self, agent: &str) -> PromptView {
        PromptView {
            agent: agent.to_string(),
            default: self.default.to_string(),
            current: self.current.clone(),
            is_custom: self.is_custom(),
        }
    }
}

pub struct PromptStore {
    records: Mutex<BTreeMap<&'static str, PromptRecord>>,
    path: Option<PathBuf>,
}

impl PromptStore {
    /// Seeds the defaults and overlays any persisted customizations found
    /// at `path`. A missing file is a clean start; an unreadable one is a
    /// configuration error.
    pub fn new(path: Option<PathBuf>) -> Result<Self, EngineError> {
        let mut records: BTreeMap<&'static str, PromptRecord> = PROMPT_AGENTS
            .iter()
            .map(|&agent| {
                let default = default_for(agent).unwrap_or_default();
                (
                    agent,
                    PromptRecord {
                        default,
                        current: default.to_string(),
                    },
                )
            })
            .collect();

        if let Some(path) = &path {
            if path.exists() {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    EngineError::Config(format!("read prompts file {}: {e}", path.display()))
                })?;
                let customs: BTreeMap<String, String> =
                    serde_json::from_str(&text).map_err(|e| {
                        EngineError::Config(format!("parse prompts file {}: {e}", path.display()))
                    })?;
                for (agent, current) in customs {
                    match records.iter_mut().find(|(key, _)| **key == agent) {
                        Some((_, record)) => record.current = current,
                        None => warn!(agent, "prompts file names unknown agent; skipping"),
                    }
                }
            }
        }

        Ok(Self {
            records: Mutex::new(records),
            path,
        })
    }

    fn locked(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<&'static str, PromptRecord>>, EngineError> {
        self.records
            .lock()
            .map_err(|_| EngineError::Upstream("prompt store lock poisoned".to_string()))
    }

    pub fn list(&self) -> Result<Vec<PromptView>, EngineError> {
        Ok(self
            .locked()?
            .iter()
            .map(|(agent, record)| record.view(agent))
            .collect())
    }

    pub fn get(&self, agent: &str) -> Result<PromptView, EngineError> {
        self.locked()?
            .iter()
            .find(|(key, _)| **key == agent)
            .map(|(key, record)| record.view(key))
            .ok_or_else(|| EngineError::NotFound(format!("agent prompt {agent}")))
    }

    /// Effective system prompt for an agent; the built-in default when the
    /// agent is unknown (callers pass compile-time keys).
    pub fn effective(&self, agent: &str) -> String {
        self.locked()
            .ok()
            .and_then(|records| {
                records
                    .iter()
                    .find(|(key, _)| **key == agent)
                    .map(|(_, record)| record.current.clone())
            })
            .unwrap_or_default()
    }

    /// Replaces an agent's current prompt. Putting the default text back
    /// clears the custom flag.
    pub fn put(&self, agent: &str, prompt: &str) -> Result<PromptView, EngineError> {
        let view = {
            let mut records = self.locked()?;
            let (key, record) = records
                .iter_mut()
                .find(|(key, _)| **key == agent)
                .ok_or_else(|| EngineError::NotFound(format!("agent prompt {agent}")))?;
            record.current = prompt.to_string();
            record.view(key)
        };
        self.persist()?;
        Ok(view)
    }

    /// Restores defaults for one agent, or all when `agent` is `None`.
    /// Idempotent.
    pub fn reset(&self, agent: Option<&str>) -> Result<(), EngineError> {
        {
            let mut records = self.locked()?;
            match agent {
                Some(agent) => {
                    let (_, record) = records
                        .iter_mut()
                        .find(|(key, _)| **key == agent)
                        .ok_or_else(|| EngineError::NotFound(format!("agent prompt {agent}")))?;
                    record.current = record.default.to_string();
                }
                None => {
                    for record in records.values_mut() {
                        record.current = record.default.to_string();
                    }
                }
            }
        }
        self.persist()
    }

    /// Writes the customized prompts to disk via temp-file + atomic rename.
    /// A `None` path means in-memory only.
    fn persist(&self) -> Result<(), EngineError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let customs: BTreeMap<&str, String> = self
            .locked()?
            .iter()
            .filter(|(_, record)| record.is_custom())
            .map(|(key, record)| (*key, record.current.clone()))
            .collect();
        let json = serde_json::to_string_pretty(&customs)
            .map_err(|e| EngineError::Config(format!("serialize prompts: {e}")))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EngineError::Config(format!("create prompts dir {}: {e}", parent.display()))
                })?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| EngineError::Config(format!("write prompts file {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            EngineError::Config(format!("replace prompts file {}: {e}", path.display()))
        })?;
        Ok(())
    }
}
