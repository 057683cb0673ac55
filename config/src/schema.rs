//! Typed configuration sections.
//!
//! One struct per recognized YAML section. Every field has a built-in default
//! so a missing file, a missing section, or a missing key all resolve to a
//! runnable configuration; the loader then applies environment overrides on
//! top (see [`crate::load`]).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration: one field per recognized top-level YAML section.
///
/// Unknown top-level keys are rejected by the loader before this struct is
/// deserialized; unknown nested keys are warned about and ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
    pub incident_connector: IncidentConnectorConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub cache: CacheConfig,
    pub agents: AgentsConfig,
    /// Path of the custom-prompts JSON document. `None` disables persistence
    /// (prompt edits live only in memory).
    pub prompts_path: Option<PathBuf>,
    pub prompt_logs: PromptLogConfig,
}

/// LLM provider selection and per-provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Model name; `None` picks the provider default.
    pub model: Option<String>,
    pub temperature: f32,
    /// Required for `openai` and `gemini`; ignored by `ollama` and `mock`.
    pub api_key: Option<String>,
    /// Endpoint override; each provider has a built-in default.
    pub base_url: Option<String>,
    /// Total timeout for a blocking completion call.
    pub request_timeout_secs: u64,
    /// Maximum silence between two streamed chunks before the stream is
    /// treated as failed.
    pub stream_idle_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            model: None,
            temperature: 0.2,
            api_key: None,
            base_url: None,
            request_timeout_secs: 60,
            stream_idle_timeout_secs: 30,
        }
    }
}

/// Supported LLM backends. `Mock` is a deterministic in-process provider used
/// by tests and the connectivity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Openai,
    Gemini,
    Ollama,
    Mock,
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::Openai),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            _ => Err(format!(
                "unknown llm provider: {} (use openai, gemini, ollama, or mock)",
                s
            )),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Openai => "openai",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        };
        f.write_str(s)
    }
}

/// Log level, file sink, and function-tracing switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `debug`, `info`, `warning`, `error`, `critical`.
    pub level: String,
    /// When true, function entry/exit spans are logged (arguments with
    /// sensitive names are redacted, see [`crate::redact`]).
    pub enable_tracing: bool,
    /// Optional log file; rotated by size when it grows past `max_bytes`.
    pub file: Option<PathBuf>,
    pub max_bytes: u64,
    pub backup_count: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_tracing: false,
            file: None,
            max_bytes: 10 * 1024 * 1024,
            backup_count: 3,
        }
    }
}

/// Incident-source connector selection. Variant-specific key sets are
/// closed: an unknown key inside a variant record is a configuration
/// error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IncidentConnectorConfig {
    Mock(MockConnectorConfig),
    Servicenow(ServiceNowConnectorConfig),
    Jira(JiraConnectorConfig),
}

impl Default for IncidentConnectorConfig {
    fn default() -> Self {
        Self::Mock(MockConnectorConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MockConnectorConfig {
    /// Directory holding `incidents.csv`, `servicenow_tickets.csv`, and
    /// `change_correlations.csv`.
    pub data_dir: PathBuf,
}

impl Default for MockConnectorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceNowConnectorConfig {
    pub instance_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JiraConnectorConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    #[serde(default)]
    pub project: Option<String>,
}

/// Knowledge-base connector selection; same closed-variant rule as the
/// incident connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KnowledgeBaseConfig {
    Mock(MockKnowledgeBaseConfig),
    Confluence(ConfluenceConfig),
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self::Mock(MockKnowledgeBaseConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MockKnowledgeBaseConfig {
    /// `confluence_docs.csv`; optional, the folder alone is enough.
    pub csv_path: Option<PathBuf>,
    /// Directory of markdown/text runbooks with optional front-matter.
    pub docs_folder: Option<PathBuf>,
}

impl Default for MockKnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            csv_path: Some(PathBuf::from("data/confluence_docs.csv")),
            docs_folder: Some(PathBuf::from("data/runbooks")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfluenceConfig {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    #[serde(default)]
    pub space_key: Option<String>,
}

/// Agent-result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 300 }
    }
}

/// Tunables shared by the evidence agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub max_similar_incidents: usize,
    pub similarity_threshold: f64,
    pub max_knowledge_docs: usize,
    /// N in the rendered context: similar incidents and knowledge articles
    /// are capped at this many entries each.
    pub context_items: usize,
    pub change_window_days: i64,
    pub change_window_after_hours: i64,
    /// Minimum description/resolution length for full quality credit.
    pub min_quality_text_len: usize,
    pub quality_good_threshold: f64,
    pub quality_warning_threshold: f64,
    pub connector_timeout_secs: u64,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            max_similar_incidents: 5,
            similarity_threshold: 0.2,
            max_knowledge_docs: 5,
            context_items: 5,
            change_window_days: 7,
            change_window_after_hours: 1,
            min_quality_text_len: 20,
            quality_good_threshold: 0.8,
            quality_warning_threshold: 0.5,
            connector_timeout_secs: 10,
        }
    }
}

/// Bounded in-memory prompt log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptLogConfig {
    pub max_entries: usize,
}

impl Default for PromptLogConfig {
    fn default() -> Self {
        Self { max_entries: 200 }
    }
}
