//! State graph builder: nodes plus explicit edges (from → to).
//!
//! Add nodes with `add_node`, define the chain with `add_edge(from, to)`
//! using `START` and `END` for graph entry/exit, then `compile` to get a
//! [`CompiledStateGraph`]. Edges must form a single linear chain; branches
//! and cycles are compile errors.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::CompiledStateGraph;
use crate::graph::node::Node;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)`.
pub const END: &str = "__end__";

/// State graph: nodes plus explicit linear edges.
///
/// Generic over state type `S`. Build with `add_node` / `add_edge`, then
/// `compile()` to obtain an executable graph.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: Vec<(String, String)>,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
        }
    }

    /// Adds a node; id must be unique. Replaces if same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds an edge from `from_id` to `to_id`. Use `START` for graph entry
    /// and `END` for graph exit; both ids (except the sentinels) must be
    /// registered via `add_node` before `compile()`.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Builds the executable graph: validates that all edge node ids exist
    /// and the edges form a single linear chain from START to END.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }

        let start_edges: Vec<_> = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t.clone())
            .collect();
        let first = match start_edges.len() {
            0 => return Err(CompilationError::MissingStart),
            1 => start_edges.into_iter().next().unwrap(),
            _ => {
                return Err(CompilationError::InvalidChain(
                    "multiple edges from START (branch)".into(),
                ))
            }
        };

        if !self.edges.iter().any(|(_, t)| t == END) {
            return Err(CompilationError::MissingEnd);
        }

        let linear_next: HashMap<String, String> = self
            .edges
            .iter()
            .filter(|(f, _)| f.as_str() != START)
            .map(|(f, t)| (f.clone(), t.clone()))
            .collect();
        if linear_next.len() != self.edges.iter().filter(|(f, _)| f.as_str() != START).count() {
            return Err(CompilationError::InvalidChain(
                "duplicate from (branch)".into(),
            ));
        }

        let mut order = vec![first.clone()];
        let mut visited = HashSet::new();
        visited.insert(first.clone());
        let mut current = first;
        loop {
            let next = match linear_next.get(&current) {
                Some(n) => n.clone(),
                None => {
                    return Err(CompilationError::InvalidChain(format!(
                        "node {current} has no outgoing edge"
                    )))
                }
            };
            if next == END {
                break;
            }
            if visited.contains(&next) {
                return Err(CompilationError::InvalidChain("cycle detected".into()));
            }
            visited.insert(next.clone());
            order.push(next.clone());
            current = next;
        }

        Ok(CompiledStateGraph::new(self.nodes, order))
    }
}
