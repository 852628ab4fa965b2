//! Graph node trait: one step in a StateGraph.
//!
//! Receives the current state and the run context, returns a [`StateDelta`] with the
//! fields it sets. Routing is not a node concern: the edge registered for the node
//! decides what runs next. Build-time options ([`NodeOptions`]) declare best-effort
//! execution and a per-node deadline.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::state::{StateContainer, StateDelta};

use super::RunContext;

/// One step in a graph: `(state, context) -> delta`.
///
/// `C` is the external context type shared by all nodes of a graph (capabilities,
/// clients); it is reached through [`RunContext::context`]. A transform may launch and
/// join concurrent work internally, but must fully resolve it before returning.
///
/// **Interaction**: Registered with `StateGraph::add_node`; invoked by the
/// [`NodeExecutor`](super::NodeExecutor) during `CompiledGraph::run`.
#[async_trait]
pub trait Node<C>: Send + Sync
where
    C: Send + Sync + 'static,
{
    /// One step: read state, return the fields to merge.
    ///
    /// Errors are wrapped as `NodeExecution { node_id, cause }` with the error preserved.
    async fn run(&self, state: &StateContainer, ctx: &RunContext<C>)
        -> Result<StateDelta, BoxError>;
}

/// Per-node options fixed at graph-build time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeOptions {
    /// When true, a transform error is logged and replaced by an empty delta. Timeouts
    /// stay fatal.
    pub best_effort: bool,
    /// Deadline for one execution of this node; falls back to the engine default.
    pub timeout: Option<Duration>,
}

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
