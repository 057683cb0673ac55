//! LLM client abstraction: blocking completion plus token streaming.
//!
//! The [`LlmClient`] trait has three remote implementations (OpenAI, Gemini
//! through its OpenAI-compatible surface, Ollama) and a deterministic
//! [`MockLlm`]. A provider factory builds the configured variant;
//! [`LlmHandle`] owns the live instance and hot-swaps it on admin updates,
//! appending a prompt-log record before every call.
//!
//! # Streaming
//!
//! `stream()` returns a lazy, finite, single-shot sequence of text chunks.
//! Dropping the stream aborts the underlying network request, which is how
//! SSE client disconnects cancel the provider call. Silence between chunks
//! beyond the configured idle timeout surfaces as an error item.

mod mock;
mod ollama;
mod openai;

pub use mock::MockLlm;
pub use ollama::OllamaClient;
pub use openai::OpenAiCompatClient;

use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::promptlog::{PromptLogEntry, PromptLogStore, PromptType};
use config::{LlmConfig, LlmProvider};

/// Role of one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Lazy sequence of streamed text chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, EngineError>> + Send>>;

/// An LLM backend: one blocking call, one streaming call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider tag (`openai`, `gemini`, `ollama`, `mock`).
    fn provider(&self) -> &str;

    /// Model name in use.
    fn model(&self) -> &str;

    /// Blocking completion: full assistant text.
    async fn complete(&self, system: &str, messages: &[ChatMessage])
        -> Result<String, EngineError>;

    /// Streaming completion: chunks in provider order, ending when the
    /// provider closes the stream.
    async fn stream(&self, system: &str, messages: &[ChatMessage])
        -> Result<ChunkStream, EngineError>;
}

/// Builds the configured provider. Keyed providers without an API key are a
/// configuration error.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, EngineError> {
    match config.provider {
        LlmProvider::Openai => Ok(Arc::new(OpenAiCompatClient::openai(config)?)),
        LlmProvider::Gemini => Ok(Arc::new(OpenAiCompatClient::gemini(config)?)),
        LlmProvider::Ollama => Ok(Arc::new(OllamaClient::new(config)?)),
        LlmProvider::Mock => Ok(Arc::new(MockLlm::scripted())),
    }
}

/// Metadata attached to each LLM call for the prompt log.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub incident_id: String,
    pub prompt_type: PromptType,
    pub context_summary: String,
    pub conversation_history: Vec<ChatMessage>,
}

/// Owner of the live client instance.
///
/// Calls snapshot the `Arc` and release the lock before touching the
/// network, so a concurrent admin swap never blocks behind an in-flight
/// completion.
pub struct LlmHandle {
    client: RwLock<Arc<dyn LlmClient>>,
    config: Mutex<LlmConfig>,
    prompt_log: Arc<PromptLogStore>,
}

impl LlmHandle {
    pub fn new(config: LlmConfig, prompt_log: Arc<PromptLogStore>) -> Result<Self, EngineError> {
        let client = build_client(&config)?;
        Ok(Self::with_client(client, config, prompt_log))
    }

    /// Wraps an existing client instance (embedding, tests with scripted
    /// clients). `swap` still rebuilds from configuration.
    pub fn with_client(
        client: Arc<dyn LlmClient>,
        config: LlmConfig,
        prompt_log: Arc<PromptLogStore>,
    ) -> Self {
        Self {
            client: RwLock::new(client),
            config: Mutex::new(config),
            prompt_log,
        }
    }

    /// Current client instance.
    pub fn snapshot(&self) -> Arc<dyn LlmClient> {
        self.client
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Current configuration (for the admin GET; mask the key before
    /// returning it to a client).
    pub fn current_config(&self) -> LlmConfig {
        self.config
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Rebuilds the client from `config` and swaps it in. The old instance
    /// finishes any in-flight calls on its own snapshot.
    pub fn swap(&self, config: LlmConfig) -> Result<(), EngineError> {
        let client = build_client(&config)?;
        if let Ok(mut slot) = self.client.write() {
            *slot = client;
        }
        if let Ok(mut current) = self.config.lock() {
            *current = config;
        }
        Ok(())
    }

    fn log_call(&self, system: &str, messages: &[ChatMessage], context: &PromptContext) {
        let user_message = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompt_log.append(PromptLogEntry::new(
            context.incident_id.clone(),
            context.prompt_type,
            system,
            user_message,
            context.context_summary.clone(),
            context.conversation_history.clone(),
        ));
    }

    /// Blocking completion with prompt logging. Message bodies and any
    /// credentials inside the client stay out of the span.
    #[tracing::instrument(level = "trace", skip_all, fields(incident = %context.incident_id))]
    pub async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
        context: &PromptContext,
    ) -> Result<String, EngineError> {
        self.log_call(system, messages, context);
        self.snapshot().complete(system, messages).await
    }

    /// Streaming completion with prompt logging.
    #[tracing::instrument(level = "trace", skip_all, fields(incident = %context.incident_id))]
    pub async fn stream(
        &self,
        system: &str,
        messages: &[ChatMessage],
        context: &PromptContext,
    ) -> Result<ChunkStream, EngineError> {
        self.log_call(system, messages, context);
        self.snapshot().stream(system, messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn mock_config() -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::Mock,
            ..LlmConfig::default()
        }
    }

    fn context() -> PromptContext {
        PromptContext {
            incident_id: "INC001".to_string(),
            prompt_type: PromptType::Synthesis,
            context_summary: "top suspect CHG005".to_string(),
            conversation_history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn handle_logs_before_completing() {
        let log = Arc::new(PromptLogStore::new(10));
        let handle = LlmHandle::new(mock_config(), log.clone()).unwrap();
        let reply = handle
            .complete("you are helpful", &[ChatMessage::user("what happened?")], &context())
            .await
            .unwrap();
        assert!(!reply.is_empty());
        let entries = log.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_message, "what happened?");
        assert_eq!(entries[0].system_prompt, "you are helpful");
    }

    #[tokio::test]
    async fn handle_streams_chunks_in_order() {
        let log = Arc::new(PromptLogStore::new(10));
        let handle = LlmHandle::new(mock_config(), log).unwrap();
        let mut stream = handle
            .stream("sys", &[ChatMessage::user("hi")], &context())
            .await
            .unwrap();
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.unwrap());
        }
        assert!(chunks.len() >= 2, "mock emits multiple chunks: {chunks:?}");
    }

    #[tokio::test]
    async fn swap_replaces_the_instance() {
        let log = Arc::new(PromptLogStore::new(10));
        let handle = LlmHandle::new(mock_config(), log).unwrap();
        assert_eq!(handle.snapshot().provider(), "mock");
        let mut next = mock_config();
        next.model = Some("other-model".to_string());
        handle.swap(next).unwrap();
        assert_eq!(
            handle.current_config().model.as_deref(),
            Some("other-model")
        );
    }

    #[test]
    fn keyed_provider_without_key_is_config_error() {
        let config = LlmConfig {
            provider: LlmProvider::Openai,
            api_key: None,
            ..LlmConfig::default()
        };
        assert!(matches!(
            build_client(&config).err(),
            Some(EngineError::Config(_))
        ));
    }
}
