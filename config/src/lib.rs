//! Layered configuration for SmartRecover.
//!
//! Precedence (highest first): **environment variables > YAML file >
//! built-in defaults**. The YAML document's recognized top-level sections
//! are `llm`, `logging`, `incident_connector`, `knowledge_base`, `cache`,
//! `agents`, `prompts_path`, `prompt_logs`; an unrecognized top-level key is
//! a load error, an unrecognized nested key is logged as a warning and
//! ignored (connector variants are the exception: their key sets are closed
//! and an unknown key is an error).

mod env_overrides;
pub mod redact;
mod schema;
#[cfg(feature = "tracing-init")]
pub mod tracing_init;
mod unknown_keys;

use std::path::Path;

use thiserror::Error;

pub use schema::{
    AgentsConfig, AppConfig, CacheConfig, ConfluenceConfig, IncidentConnectorConfig,
    JiraConnectorConfig, KnowledgeBaseConfig, LlmConfig, LlmProvider, LoggingConfig,
    MockConnectorConfig, MockKnowledgeBaseConfig, PromptLogConfig, ServiceNowConnectorConfig,
};

/// Recognized top-level YAML sections, in document order.
pub const SECTIONS: &[&str] = &[
    "llm",
    "logging",
    "incident_connector",
    "knowledge_base",
    "cache",
    "agents",
    "prompts_path",
    "prompt_logs",
];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unknown top-level config section: {0}")]
    UnknownSection(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("environment selects {what} but {var} is not set")]
    MissingEnv { what: String, var: String },
}

/// Loads configuration with full precedence: built-in defaults, then the
/// YAML file at `path` (if given and present), then environment overrides.
///
/// A `None` path means defaults + environment only.
pub fn load(path: Option<&Path>) -> Result<AppConfig, LoadError> {
    let mut config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|e| LoadError::Read {
                path: p.display().to_string(),
                source: e,
            })?;
            parse_yaml(&text)?
        }
        None => AppConfig::default(),
    };
    env_overrides::apply(&mut config)?;
    Ok(config)
}

/// Parses a YAML document into an [`AppConfig`].
///
/// Rejects unknown top-level sections; warns about unknown nested keys in
/// the open sections; lets serde reject unknown keys inside connector
/// variants (closed key sets).
pub fn parse_yaml(text: &str) -> Result<AppConfig, LoadError> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    if let serde_yaml::Value::Mapping(ref map) = value {
        for key in map.keys() {
            let name = key.as_str().unwrap_or_default();
            if !SECTIONS.contains(&name) {
                return Err(LoadError::UnknownSection(name.to_string()));
            }
        }
        unknown_keys::warn_unknown_nested(map);
    }
    let config: AppConfig = serde_yaml::from_value(value)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_document() {
        let config = parse_yaml("{}").unwrap();
        assert_eq!(config.cache.ttl_seconds, 300);
        assert_eq!(config.agents.max_similar_incidents, 5);
        assert!((config.agents.similarity_threshold - 0.2).abs() < 1e-9);
        assert_eq!(config.prompt_logs.max_entries, 200);
    }

    #[test]
    fn unknown_top_level_section_is_rejected() {
        let err = parse_yaml("observability:\n  level: info\n").unwrap_err();
        match err {
            LoadError::UnknownSection(name) => assert_eq!(name, "observability"),
            other => panic!("expected UnknownSection, got {:?}", other),
        }
    }

    #[test]
    fn unknown_nested_key_is_accepted() {
        let config = parse_yaml("cache:\n  ttl_seconds: 60\n  shards: 4\n").unwrap();
        assert_eq!(config.cache.ttl_seconds, 60);
    }

    #[test]
    fn unknown_connector_variant_key_is_rejected() {
        let err = parse_yaml(
            "incident_connector:\n  type: servicenow\n  instance_url: https://x\n  username: u\n  password: p\n  region: eu\n",
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn connector_variant_parses_from_tagged_record() {
        let config = parse_yaml(
            "incident_connector:\n  type: jira\n  base_url: https://jira.local\n  email: a@b.c\n  api_token: t\n",
        )
        .unwrap();
        match config.incident_connector {
            IncidentConnectorConfig::Jira(jira) => {
                assert_eq!(jira.base_url, "https://jira.local")
            }
            other => panic!("expected jira connector, got {:?}", other),
        }
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent_smartrecover_config.yaml"))).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }

    #[test]
    fn load_reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "cache:\n  ttl_seconds: 120\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.cache.ttl_seconds, 120);
    }
}
