//! Ollama client (local HTTP endpoint, no key).
//!
//! Uses the native `/api/chat` endpoint: a single JSON body for blocking
//! calls, newline-delimited JSON objects for streaming.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::llm::{ChatMessage, ChatRole, ChunkStream, LlmClient};
use config::LlmConfig;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OllamaClient {
    blocking: reqwest::Client,
    streaming: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    idle_timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, EngineError> {
        let blocking = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EngineError::Config(format!("build http client: {e}")))?;
        let streaming = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| EngineError::Config(format!("build http client: {e}")))?;
        Ok(Self {
            blocking,
            streaming,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            idle_timeout: Duration::from_secs(config.stream_idle_timeout_secs),
        })
    }

    fn body(&self, system: &str, messages: &[ChatMessage], stream: bool) -> Value {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            wire.push(json!({ "role": "system", "content": system }));
        }
        for message in messages {
            let role = match message.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            wire.push(json!({ "role": role, "content": message.content }));
        }
        json!({
            "model": self.model,
            "messages": wire,
            "stream": stream,
            "options": { "temperature": self.temperature },
        })
    }

    async fn send(
        &self,
        client: &reqwest::Client,
        body: Value,
    ) -> Result<reqwest::Response, EngineError> {
        let response = client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Upstream("ollama: request timed out".to_string())
                } else {
                    EngineError::Upstream(format!("ollama: {}", e.without_url()))
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Upstream(format!(
                "ollama: status {}",
                status.as_u16()
            )));
        }
        Ok(response)
    }
}

/// One parsed NDJSON line of an Ollama chat stream.
struct StreamLine {
    content: Option<String>,
    done: bool,
}

fn parse_line(line: &str) -> Result<StreamLine, EngineError> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| EngineError::Upstream(format!("ollama: bad stream line: {e}")))?;
    Ok(StreamLine {
        content: value
            .pointer("/message/content")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        done: value.get("done").and_then(Value::as_bool).unwrap_or(false),
    })
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<String, EngineError> {
        let response = self
            .send(&self.blocking, self.body(system, messages, false))
            .await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Upstream(format!("ollama: decode body: {}", e.without_url())))?;
        body.pointer("/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EngineError::Upstream("ollama: completion without content".to_string()))
    }

    async fn stream(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<ChunkStream, EngineError> {
        let response = self
            .send(&self.streaming, self.body(system, messages, true))
            .await?;

        // Re-frame the byte stream into NDJSON lines before parsing.
        let lines = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| EngineError::Upstream(format!("ollama: stream: {e}"))))
            .scan(String::new(), |buffer, chunk| {
                let out: Vec<Result<String, EngineError>> = match chunk {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        let mut lines = Vec::new();
                        while let Some(pos) = buffer.find('\n') {
                            let line: String = buffer.drain(..=pos).collect();
                            let line = line.trim().to_string();
                            if !line.is_empty() {
                                lines.push(Ok(line));
                            }
                        }
                        lines
                    }
                    Err(e) => vec![Err(e)],
                };
                futures::future::ready(Some(futures::stream::iter(out)))
            })
            .flatten();

        let parsed = lines.map(|line| line.and_then(|l| parse_line(&l)));
        let chunks = parsed
            .take_while(|line| {
                futures::future::ready(!matches!(line, Ok(l) if l.done && l.content.is_none()))
            })
            .filter_map(|line| {
                futures::future::ready(match line {
                    Ok(l) => l.content.map(Ok),
                    Err(e) => Some(Err(e)),
                })
            });

        let with_idle_timeout =
            tokio_stream::StreamExt::timeout(chunks, self.idle_timeout).map(|item| match item {
                Ok(chunk) => chunk,
                Err(_) => Err(EngineError::Upstream("ollama: stream idle timeout".to_string())),
            });

        Ok(Box::pin(with_idle_timeout))
    }
}
