//! Run-time error types.
//!
//! Every run that does not reach the terminal returns a [`RunError`]: the reason
//! ([`RunErrorKind`]) plus the partial [`ExecutionTrace`] up to the failure. Build-time
//! problems are [`CompilationError`](crate::graph::CompilationError) and never occur
//! during a run.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::graph::ExecutionTrace;
use crate::state::StateError;

/// Boxed error returned by node transforms; preserved as the `source` of `NodeExecution`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a run stopped without reaching the terminal.
#[derive(Debug, Error)]
pub enum RunErrorKind {
    /// A routing predicate returned a target outside the node's declared targets.
    #[error("node `{node_id}` routed to undeclared target `{target}`")]
    Routing { node_id: String, target: String },

    /// A routing predicate could not read the state it routes on.
    #[error("routing predicate of node `{node_id}` failed: {cause}")]
    RoutingPredicate {
        node_id: String,
        #[source]
        cause: StateError,
    },

    /// The node transform returned an error (fatal unless the node is best-effort).
    #[error("node `{node_id}` failed: {cause}")]
    NodeExecution {
        node_id: String,
        #[source]
        cause: BoxError,
    },

    /// The node exceeded its own deadline. Always fatal.
    #[error("node `{node_id}` timed out after {timeout:?}")]
    NodeTimeout { node_id: String, timeout: Duration },

    /// The run deadline elapsed; `node_id` is the node running or about to run.
    #[error("run timed out after {timeout:?} at node `{node_id}`")]
    RunTimeout { node_id: String, timeout: Duration },

    /// More than `limit` node dispatches; usually a looping graph.
    #[error("step limit of {limit} exceeded before node `{node_id}`")]
    StepLimitExceeded { limit: usize, node_id: String },

    /// The terminal was reached but Output fields are missing; `node_id` routed to it.
    #[error(
        "terminal reached from node `{node_id}` with missing output fields: {}",
        .missing.join(", ")
    )]
    IncompleteOutput {
        node_id: String,
        missing: Vec<String>,
    },

    /// An Input field was absent from the initial state.
    #[error("initial state is missing input field `{field}`")]
    MissingInput { field: String },

    /// The cancellation token was signalled; the run stopped before `node_id`.
    #[error("run cancelled before node `{node_id}`")]
    Cancelled { node_id: String },
}

impl RunErrorKind {
    /// Node the condition is attached to, when there is one.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            RunErrorKind::Routing { node_id, .. }
            | RunErrorKind::RoutingPredicate { node_id, .. }
            | RunErrorKind::NodeExecution { node_id, .. }
            | RunErrorKind::NodeTimeout { node_id, .. }
            | RunErrorKind::RunTimeout { node_id, .. }
            | RunErrorKind::StepLimitExceeded { node_id, .. }
            | RunErrorKind::IncompleteOutput { node_id, .. }
            | RunErrorKind::Cancelled { node_id } => Some(node_id),
            RunErrorKind::MissingInput { .. } => None,
        }
    }
}

/// A run that ended without reaching the terminal.
///
/// Carries the reason, the node id where it applies, and the partial trace. The original
/// cause of a node failure is available through [`std::error::Error::source`].
#[derive(Debug)]
pub struct RunError {
    kind: RunErrorKind,
    trace: ExecutionTrace,
}

impl RunError {
    pub fn new(kind: RunErrorKind, trace: ExecutionTrace) -> Self {
        Self { kind, trace }
    }

    pub fn kind(&self) -> &RunErrorKind {
        &self.kind
    }

    /// Nodes dispatched before the run stopped, in order.
    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    pub fn node_id(&self) -> Option<&str> {
        self.kind.node_id()
    }

    /// Cancellation is a termination reason rather than a failure; callers usually
    /// report it differently.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, RunErrorKind::Cancelled { .. })
    }

    pub fn into_parts(self) -> (RunErrorKind, ExecutionTrace) {
        (self.kind, self.trace)
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (trace: [{}])", self.kind, self.trace)
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}
