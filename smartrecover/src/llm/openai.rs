//! OpenAI-compatible chat-completions client.
//!
//! Serves two providers: OpenAI itself and Gemini through Google's
//! OpenAI-compatibility endpoint, so both share one request codec and one
//! SSE parser. Streaming consumes `data:` frames until the `[DONE]`
//! sentinel; the configured idle timeout turns silence between chunks into
//! an error item.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::llm::{ChatMessage, ChatRole, ChunkStream, LlmClient};
use config::LlmConfig;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    stream: bool,
}

pub struct OpenAiCompatClient {
    provider: &'static str,
    blocking: reqwest::Client,
    streaming: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    idle_timeout: Duration,
}

impl OpenAiCompatClient {
    pub fn openai(config: &LlmConfig) -> Result<Self, EngineError> {
        Self::build(config, "openai", OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL)
    }

    pub fn gemini(config: &LlmConfig) -> Result<Self, EngineError> {
        Self::build(config, "gemini", GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL)
    }

    fn build(
        config: &LlmConfig,
        provider: &'static str,
        default_base: &str,
        default_model: &str,
    ) -> Result<Self, EngineError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EngineError::Config(format!("{provider} requires an api key")))?;
        // The blocking client carries the total timeout; the streaming one
        // must not, or long generations would be cut off mid-stream.
        let blocking = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EngineError::Config(format!("build http client: {e}")))?;
        let streaming = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| EngineError::Config(format!("build http client: {e}")))?;
        Ok(Self {
            provider,
            blocking,
            streaming,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            temperature: config.temperature,
            idle_timeout: Duration::from_secs(config.stream_idle_timeout_secs),
        })
    }

    fn wire_messages<'a>(system: &'a str, messages: &'a [ChatMessage]) -> Vec<WireMessage<'a>> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            wire.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        for message in messages {
            wire.push(WireMessage {
                role: match message.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &message.content,
            });
        }
        wire
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(
        &self,
        client: &reqwest::Client,
        system: &str,
        messages: &[ChatMessage],
        stream: bool,
    ) -> Result<reqwest::Response, EngineError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: Self::wire_messages(system, messages),
            temperature: self.temperature,
            stream,
        };
        let response = client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Upstream(format!("{}: request timed out", self.provider))
                } else {
                    EngineError::Upstream(format!("{}: {}", self.provider, e.without_url()))
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Upstream(format!(
                "{}: status {}",
                self.provider,
                status.as_u16()
            )));
        }
        Ok(response)
    }
}

/// Pulls the content delta out of one streamed chunk, if it carries one.
fn delta_content(data: &str) -> Result<Option<String>, EngineError> {
    let value: Value = serde_json::from_str(data)
        .map_err(|e| EngineError::Upstream(format!("bad stream chunk: {e}")))?;
    Ok(value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider(&self) -> &str {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<String, EngineError> {
        let response = self.send(&self.blocking, system, messages, false).await?;
        let body: Value = response.json().await.map_err(|e| {
            EngineError::Upstream(format!("{}: decode body: {}", self.provider, e.without_url()))
        })?;
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                EngineError::Upstream(format!("{}: completion without content", self.provider))
            })
    }

    async fn stream(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<ChunkStream, EngineError> {
        let provider = self.provider;
        let response = self.send(&self.streaming, system, messages, true).await?;
        let events = response.bytes_stream().eventsource();

        let chunks = events
            .take_while(|event| {
                futures::future::ready(!matches!(event, Ok(e) if e.data == "[DONE]"))
            })
            .filter_map(move |event| {
                futures::future::ready(match event {
                    Ok(event) => delta_content(&event.data).transpose(),
                    Err(e) => Some(Err(EngineError::Upstream(format!(
                        "{provider}: stream: {e}"
                    )))),
                })
            });

        let with_idle_timeout =
            tokio_stream::StreamExt::timeout(chunks, self.idle_timeout).map(move |item| match item {
                Ok(chunk) => chunk,
                Err(_) => Err(EngineError::Upstream(format!(
                    "{provider}: stream idle timeout"
                ))),
            });

        Ok(Box::pin(with_idle_timeout))
    }
}
