//! Executable graph produced by [`StateGraph::compile`](crate::graph::StateGraph::compile).

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::EngineError;
use crate::graph::next::Next;
use crate::graph::node::Node;

/// Immutable, runnable chain of nodes.
///
/// `invoke` threads the state through the nodes in compiled order. A node
/// error aborts the run and is logged with the node id; graceful
/// degradation is the nodes' responsibility (see [`Node`]).
pub struct CompiledStateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    order: Vec<String>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub(crate) fn new(nodes: HashMap<String, Arc<dyn Node<S>>>, order: Vec<String>) -> Self {
        Self { nodes, order }
    }

    /// Node ids in execution order.
    pub fn node_order(&self) -> &[String] {
        &self.order
    }

    /// Runs the chain to completion (or until a node returns `Next::End`).
    pub async fn invoke(&self, mut state: S) -> Result<S, EngineError> {
        for id in &self.order {
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| EngineError::Config(format!("compiled graph lost node {id}")))?;
            debug!(node = %id, "node start");
            let (next_state, next) = match node.run(state).await {
                Ok(output) => output,
                Err(e) => {
                    error!(node = %id, error = %e, "node failed");
                    return Err(e);
                }
            };
            debug!(node = %id, "node complete");
            state = next_state;
            if next == Next::End {
                break;
            }
        }
        Ok(state)
    }
}
