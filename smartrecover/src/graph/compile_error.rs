//! Graph compilation errors.

use thiserror::Error;

/// Why a [`StateGraph`](crate::graph::StateGraph) failed to compile.
#[derive(Debug, Error)]
pub enum CompilationError {
    #[error("edge references unknown node: {0}")]
    NodeNotFound(String),
    #[error("no edge from START")]
    MissingStart,
    #[error("no edge reaches END")]
    MissingEnd,
    #[error("invalid chain: {0}")]
    InvalidChain(String),
}
