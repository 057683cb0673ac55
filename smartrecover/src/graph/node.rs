//! Graph node trait: one step in a StateGraph.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::graph::Next;

/// One step in a graph: state in, (state out, next step).
///
/// **Interaction**: implemented by the incident loader, the five agent
/// nodes, and the synthesis node; driven by
/// [`CompiledStateGraph::invoke`](crate::graph::CompiledStateGraph::invoke).
/// Returning an error aborts the whole run, so nodes that should degrade
/// gracefully catch their own failures and return state with the slot left
/// empty.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"servicenow"`, `"logs"`). Unique within a graph.
    fn id(&self) -> &str;

    /// One step: state in, (state out, next step).
    ///
    /// Return `Next::Continue` to follow the edge order or `Next::End` to
    /// stop early.
    async fn run(&self, state: S) -> Result<(S, Next), EngineError>;
}
