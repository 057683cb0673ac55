//! Environment-variable overrides, applied on top of file/default values.
//!
//! Existing process environment always wins over the YAML document. The
//! variable names follow the deployment contract: `LLM_PROVIDER`,
//! `OPENAI_API_KEY`, `GOOGLE_API_KEY`, `OLLAMA_BASE_URL`,
//! `INCIDENT_CONNECTOR_TYPE`, `SERVICENOW_*`, `JIRA_*`,
//! `KNOWLEDGE_BASE_SOURCE`, `KB_CSV_PATH`, `KB_DOCS_FOLDER`,
//! `CONFLUENCE_*`, `LOG_LEVEL`, `ENABLE_TRACING`, `LOG_FILE`, plus
//! `LLM_MODEL`, `SMARTRECOVER_DATA_DIR`, `PROMPTS_PATH`,
//! `CACHE_TTL_SECONDS`.

use std::path::PathBuf;

use crate::redact;
use crate::schema::{
    AppConfig, ConfluenceConfig, IncidentConnectorConfig, JiraConnectorConfig,
    KnowledgeBaseConfig, LlmProvider, MockConnectorConfig, MockKnowledgeBaseConfig,
    ServiceNowConnectorConfig,
};
use crate::LoadError;

fn var(name: &str) -> Option<String> {
    let value = std::env::var(name).ok().filter(|v| !v.is_empty())?;
    tracing::debug!(var = name, value = redact::field_value(name, &value), "env override");
    Some(value)
}

fn require(what: &str, name: &str) -> Result<String, LoadError> {
    var(name).ok_or_else(|| LoadError::MissingEnv {
        what: what.to_string(),
        var: name.to_string(),
    })
}

pub(crate) fn apply(config: &mut AppConfig) -> Result<(), LoadError> {
    apply_llm(config)?;
    apply_incident_connector(config)?;
    apply_knowledge_base(config)?;
    apply_logging(config);
    apply_misc(config)?;
    Ok(())
}

fn apply_llm(config: &mut AppConfig) -> Result<(), LoadError> {
    if let Some(provider) = var("LLM_PROVIDER") {
        config.llm.provider = provider
            .parse::<LlmProvider>()
            .map_err(|message| LoadError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                message,
            })?;
    }
    if let Some(model) = var("LLM_MODEL") {
        config.llm.model = Some(model);
    }
    match config.llm.provider {
        LlmProvider::Openai => {
            if let Some(key) = var("OPENAI_API_KEY") {
                config.llm.api_key = Some(key);
            }
        }
        LlmProvider::Gemini => {
            if let Some(key) = var("GOOGLE_API_KEY") {
                config.llm.api_key = Some(key);
            }
        }
        LlmProvider::Ollama => {
            if let Some(url) = var("OLLAMA_BASE_URL") {
                config.llm.base_url = Some(url);
            }
        }
        LlmProvider::Mock => {}
    }
    Ok(())
}

fn apply_incident_connector(config: &mut AppConfig) -> Result<(), LoadError> {
    let Some(kind) = var("INCIDENT_CONNECTOR_TYPE") else {
        return Ok(());
    };
    config.incident_connector = match kind.to_lowercase().as_str() {
        "mock" => IncidentConnectorConfig::Mock(MockConnectorConfig {
            data_dir: var("SMARTRECOVER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
        }),
        "servicenow" => IncidentConnectorConfig::Servicenow(ServiceNowConnectorConfig {
            instance_url: require("servicenow connector", "SERVICENOW_INSTANCE_URL")?,
            username: require("servicenow connector", "SERVICENOW_USERNAME")?,
            password: require("servicenow connector", "SERVICENOW_PASSWORD")?,
        }),
        "jira" => IncidentConnectorConfig::Jira(JiraConnectorConfig {
            base_url: require("jira connector", "JIRA_BASE_URL")?,
            email: require("jira connector", "JIRA_EMAIL")?,
            api_token: require("jira connector", "JIRA_API_TOKEN")?,
            project: var("JIRA_PROJECT"),
        }),
        other => {
            return Err(LoadError::InvalidValue {
                key: "INCIDENT_CONNECTOR_TYPE".to_string(),
                message: format!("unknown connector type: {}", other),
            })
        }
    };
    Ok(())
}

fn apply_knowledge_base(config: &mut AppConfig) -> Result<(), LoadError> {
    if let Some(source) = var("KNOWLEDGE_BASE_SOURCE") {
        config.knowledge_base = match source.to_lowercase().as_str() {
            "mock" => KnowledgeBaseConfig::Mock(MockKnowledgeBaseConfig {
                csv_path: None,
                docs_folder: None,
            }),
            "confluence" => KnowledgeBaseConfig::Confluence(ConfluenceConfig {
                base_url: require("confluence knowledge base", "CONFLUENCE_BASE_URL")?,
                username: require("confluence knowledge base", "CONFLUENCE_USERNAME")?,
                api_token: require("confluence knowledge base", "CONFLUENCE_API_TOKEN")?,
                space_key: var("CONFLUENCE_SPACE_KEY"),
            }),
            other => {
                return Err(LoadError::InvalidValue {
                    key: "KNOWLEDGE_BASE_SOURCE".to_string(),
                    message: format!("unknown knowledge base source: {}", other),
                })
            }
        };
    }
    if let KnowledgeBaseConfig::Mock(mock) = &mut config.knowledge_base {
        if let Some(path) = var("KB_CSV_PATH") {
            mock.csv_path = Some(PathBuf::from(path));
        }
        if let Some(folder) = var("KB_DOCS_FOLDER") {
            mock.docs_folder = Some(PathBuf::from(folder));
        }
    }
    Ok(())
}

fn apply_logging(config: &mut AppConfig) {
    if let Some(level) = var("LOG_LEVEL") {
        config.logging.level = level.to_lowercase();
    }
    if let Some(enabled) = var("ENABLE_TRACING") {
        config.logging.enable_tracing =
            matches!(enabled.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
    }
    if let Some(file) = var("LOG_FILE") {
        config.logging.file = Some(PathBuf::from(file));
    }
}

fn apply_misc(config: &mut AppConfig) -> Result<(), LoadError> {
    if let Some(path) = var("PROMPTS_PATH") {
        config.prompts_path = Some(PathBuf::from(path));
    }
    if let Some(ttl) = var("CACHE_TTL_SECONDS") {
        config.cache.ttl_seconds = ttl.parse().map_err(|_| LoadError::InvalidValue {
            key: "CACHE_TTL_SECONDS".to_string(),
            message: format!("not an integer: {}", ttl),
        })?;
    }
    Ok(())
}
