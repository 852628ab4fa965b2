//! Graph configuration error.
//!
//! Returned by the `StateGraph` builder methods and by `StateGraph::compile` when the
//! declared graph is malformed. These never occur during a run.

use thiserror::Error;

/// Error building or compiling a state graph.
///
/// Builder methods (`add_node`, `add_edge`, `add_conditional_edge`) fail eagerly;
/// `compile()` validates the whole graph: start node, outgoing edges, reachability, a path
/// to END, and input/output schema compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    /// `add_node` with an id that is already registered or reserved (START / END).
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),

    /// An edge source or target is neither a registered node nor a sentinel.
    #[error("unknown edge endpoint: {0}")]
    UnknownEndpoint(String),

    /// A second `add_edge(START, _)`.
    #[error("graph already has a start node: {0}")]
    MultipleStart(String),

    /// A node already has an outgoing edge (unconditional or conditional).
    #[error("node already has an outgoing edge: {0}")]
    DuplicateEdge(String),

    /// `add_conditional_edge` with no possible targets.
    #[error("conditional edge from {0} declares no targets")]
    EmptyTargetSet(String),

    /// No `add_edge(START, _)` was declared.
    #[error("graph must have exactly one edge from START")]
    MissingStart,

    /// A node has no outgoing edge.
    #[error("node has no outgoing edge: {0}")]
    MissingOutgoingEdge(String),

    /// A node cannot be reached from the start node.
    #[error("node unreachable from start: {0}")]
    UnreachableNode(String),

    /// No path from the start node reaches END.
    #[error("no path from start reaches END")]
    NoTerminalPath,

    /// A node input is neither a graph Input field nor produced upstream of the node.
    #[error("input field `{field}` of node {node} is never produced upstream")]
    UnsatisfiedInput { node: String, field: String },

    /// An Output field is neither a graph Input field nor produced by any node.
    #[error("output field `{0}` is never produced")]
    UnproducibleOutput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of DuplicateNodeId and UnknownEndpoint contains the id.
    #[test]
    fn compilation_error_display_contains_id() {
        let s = CompilationError::DuplicateNodeId("x".into()).to_string();
        assert!(s.contains("duplicate") && s.contains("x"), "{}", s);
        let s = CompilationError::UnknownEndpoint("y".into()).to_string();
        assert!(s.contains("unknown") && s.contains("y"), "{}", s);
    }

    /// **Scenario**: Display of MissingStart and NoTerminalPath mention START / END.
    #[test]
    fn compilation_error_display_sentinels() {
        let s = CompilationError::MissingStart.to_string();
        assert!(s.contains("START"), "{}", s);
        let s = CompilationError::NoTerminalPath.to_string();
        assert!(s.contains("END"), "{}", s);
    }

    /// **Scenario**: UnsatisfiedInput names both node and field.
    #[test]
    fn compilation_error_display_unsatisfied_input() {
        let err = CompilationError::UnsatisfiedInput {
            node: "call".into(),
            field: "tool_choice".into(),
        };
        let s = err.to_string();
        assert!(s.contains("call") && s.contains("tool_choice"), "{}", s);
    }
}
