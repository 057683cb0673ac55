//! Deterministic LLM for tests and the `mock` provider.

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::EngineError;
use crate::llm::{ChatMessage, ChunkStream, LlmClient};

/// Scripted client: fixed blocking reply, fixed chunk sequence, optional
/// failure injection.
pub struct MockLlm {
    response: String,
    chunks: Vec<String>,
    fail: bool,
}

impl MockLlm {
    /// The default script used when the `mock` provider is configured:
    /// a recognizable summary with numbered steps so resolve parsing has
    /// something to chew on.
    pub fn scripted() -> Self {
        Self::new(
            "Based on the gathered evidence, the most likely cause is the most recent \
             correlated change.\n1. Review the top suspect change and roll it back if possible.\n\
             2. Check the error-level logs on the affected services.\n\
             3. Apply the resolution that worked for the similar incidents.",
            vec![
                "Based on the gathered evidence, ".to_string(),
                "the most likely cause is ".to_string(),
                "the most recent correlated change.".to_string(),
            ],
        )
    }

    pub fn new(response: impl Into<String>, chunks: Vec<String>) -> Self {
        Self {
            response: response.into(),
            chunks,
            fail: false,
        }
    }

    /// A client whose every call fails; used to exercise degradation paths.
    pub fn failing() -> Self {
        Self {
            response: String::new(),
            chunks: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        _system: &str,
        _messages: &[ChatMessage],
    ) -> Result<String, EngineError> {
        if self.fail {
            return Err(EngineError::Upstream("mock llm failure".to_string()));
        }
        Ok(self.response.clone())
    }

    async fn stream(
        &self,
        _system: &str,
        _messages: &[ChatMessage],
    ) -> Result<ChunkStream, EngineError> {
        if self.fail {
            return Err(EngineError::Upstream("mock llm failure".to_string()));
        }
        let chunks = self.chunks.clone();
        Ok(futures::stream::iter(chunks).map(Ok).boxed())
    }
}
