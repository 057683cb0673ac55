//! Engine error taxonomy.
//!
//! One variant per user-visible error kind plus `NotSupported`, an internal
//! signal connectors raise for operations they cannot serve (the agents map
//! it to an empty result, it never reaches the HTTP surface).

use thiserror::Error;

/// Errors produced by the retrieval-and-synthesis engine.
///
/// **Interaction**: connectors and the LLM layer produce `Upstream`;
/// the orchestrator recovers agent-level failures into empty result slots
/// and only propagates errors that prevent producing any response. The
/// HTTP layer maps the remaining kinds onto status codes.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Requested entity is absent.
    #[error("{0} not found")]
    NotFound(String),

    /// Schema violation, bad enum value, malformed request.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Illegal state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A connector or the LLM failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Client went away mid-stream; logged, never surfaced over HTTP.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The connector does not implement this operation (e.g. log retrieval
    /// on ServiceNow). Agents turn this into an empty result.
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl EngineError {
    /// True for failures worth one retry: timeouts and upstream 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Upstream(message) => {
                message.contains("timeout")
                    || message.contains("timed out")
                    || message.contains("status 5")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_detection_covers_timeouts_and_5xx() {
        assert!(EngineError::Upstream("request timed out".into()).is_transient());
        assert!(EngineError::Upstream("status 503 from upstream".into()).is_transient());
        assert!(!EngineError::Upstream("status 401 from upstream".into()).is_transient());
        assert!(!EngineError::NotFound("incident INC1".into()).is_transient());
    }
}
