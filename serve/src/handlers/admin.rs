//! Admin endpoints: LLM config, logging config, agent prompts, LLM
//! connectivity probe, accuracy metrics, prompt logs.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use config::redact;
use config::{LlmConfig, LlmProvider};
use smartrecover::{ChatMessage, PromptView};

use crate::app::AppState;
use crate::error::ApiError;

/// LLM configuration as shown to operators: the API key is masked, never
/// echoed.
#[derive(Debug, Serialize)]
pub struct LlmConfigView {
    provider: String,
    model: Option<String>,
    temperature: f32,
    base_url: Option<String>,
    api_key: Option<String>,
    request_timeout_secs: u64,
    stream_idle_timeout_secs: u64,
}

impl From<LlmConfig> for LlmConfigView {
    fn from(config: LlmConfig) -> Self {
        Self {
            provider: config.provider.to_string(),
            model: config.model,
            temperature: config.temperature,
            base_url: config.base_url,
            api_key: config.api_key.as_deref().map(redact::mask_secret),
            request_timeout_secs: config.request_timeout_secs,
            stream_idle_timeout_secs: config.stream_idle_timeout_secs,
        }
    }
}

pub async fn get_llm_config(State(state): State<AppState>) -> Json<LlmConfigView> {
    Json(LlmConfigView::from(state.llm.current_config()))
}

/// Partial update: absent fields keep their current values; a changed
/// provider rebuilds the client.
#[derive(Debug, Deserialize)]
pub struct LlmConfigUpdate {
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    api_key: Option<String>,
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    stream_idle_timeout_secs: Option<u64>,
}

pub async fn put_llm_config(
    State(state): State<AppState>,
    Json(update): Json<LlmConfigUpdate>,
) -> Result<Json<LlmConfigView>, ApiError> {
    let mut config = state.llm.current_config();
    if let Some(provider) = update.provider {
        config.provider = provider
            .parse::<LlmProvider>()
            .map_err(ApiError::invalid_input)?;
        // Provider switches invalidate provider-specific endpoints/keys
        // unless the caller supplies new ones.
        if update.base_url.is_none() {
            config.base_url = None;
        }
        if update.api_key.is_none() {
            config.api_key = None;
        }
    }
    if let Some(model) = update.model {
        config.model = Some(model);
    }
    if let Some(temperature) = update.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ApiError::invalid_input("temperature must be in [0, 2]"));
        }
        config.temperature = temperature;
    }
    if let Some(api_key) = update.api_key {
        config.api_key = Some(api_key);
    }
    if let Some(base_url) = update.base_url {
        config.base_url = Some(base_url);
    }
    if let Some(timeout) = update.request_timeout_secs {
        config.request_timeout_secs = timeout;
    }
    if let Some(timeout) = update.stream_idle_timeout_secs {
        config.stream_idle_timeout_secs = timeout;
    }

    state.llm.swap(config).map_err(ApiError::from_admin)?;
    Ok(Json(LlmConfigView::from(state.llm.current_config())))
}

#[derive(Debug, Serialize)]
pub struct LoggingConfigView {
    level: String,
    enable_tracing: bool,
    file: Option<String>,
}

pub async fn get_logging_config(State(state): State<AppState>) -> Json<LoggingConfigView> {
    let current = state
        .log_handle
        .as_ref()
        .map(|handle| handle.current())
        .unwrap_or_default();
    Json(LoggingConfigView {
        level: current.level,
        enable_tracing: current.enable_tracing,
        file: current.file.map(|p| p.display().to_string()),
    })
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfigUpdate {
    level: String,
    #[serde(default)]
    enable_tracing: Option<bool>,
}

pub async fn put_logging_config(
    State(state): State<AppState>,
    Json(update): Json<LoggingConfigUpdate>,
) -> Result<Json<LoggingConfigView>, ApiError> {
    let Some(handle) = state.log_handle.as_ref() else {
        return Err(ApiError::invalid_input(
            "logging is managed by the host process",
        ));
    };
    let enable_tracing = update
        .enable_tracing
        .unwrap_or_else(|| handle.current().enable_tracing);
    handle
        .set_level(&update.level, enable_tracing)
        .map_err(|e| ApiError::invalid_input(e.to_string()))?;
    Ok(get_logging_config(State(state.clone())).await)
}

pub async fn list_prompts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PromptView>>, ApiError> {
    Ok(Json(state.prompts.list()?))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    Path(agent): Path<String>,
) -> Result<Json<PromptView>, ApiError> {
    Ok(Json(state.prompts.get(&agent)?))
}

#[derive(Debug, Deserialize)]
pub struct PromptUpdate {
    prompt: String,
}

pub async fn put_prompt(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Json(update): Json<PromptUpdate>,
) -> Result<Json<PromptView>, ApiError> {
    if update.prompt.trim().is_empty() {
        return Err(ApiError::invalid_input("prompt must not be empty"));
    }
    Ok(Json(state.prompts.put(&agent, &update.prompt)?))
}

#[derive(Debug, Deserialize)]
pub struct ResetParams {
    agent_name: Option<String>,
}

pub async fn reset_prompts(
    State(state): State<AppState>,
    Query(params): Query<ResetParams>,
) -> Result<Json<Value>, ApiError> {
    state.prompts.reset(params.agent_name.as_deref())?;
    Ok(Json(json!({
        "status": "reset",
        "agent": params.agent_name,
    })))
}

/// One-shot connectivity probe against the active provider.
pub async fn test_llm(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let client = state.llm.snapshot();
    let started = Instant::now();
    let response = client
        .complete(
            "You are a connectivity probe.",
            &[ChatMessage::user("Reply with a single word: ok")],
        )
        .await?;
    Ok(Json(json!({
        "status": "ok",
        "provider": client.provider(),
        "model": client.model(),
        "latency_ms": started.elapsed().as_millis() as u64,
        "response": response,
    })))
}

pub async fn accuracy_metrics(State(state): State<AppState>) -> Json<smartrecover::AccuracyMetrics> {
    Json(state.exclusions.metrics())
}

pub async fn list_prompt_logs(State(state): State<AppState>) -> Json<Value> {
    let entries = state.prompt_log.list();
    Json(json!({
        "count": entries.len(),
        "entries": entries,
    }))
}

pub async fn clear_prompt_logs(State(state): State<AppState>) -> Json<Value> {
    state.prompt_log.clear();
    Json(json!({ "status": "cleared" }))
}
