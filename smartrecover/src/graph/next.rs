//! Routing decision returned by a node.

/// What the runner does after a node completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Follow the linear edge order.
    Continue,
    /// Stop the run; the current state is the result.
    End,
}
