//! Execution trace: node ids dispatched in one run, in order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered record of the nodes a run dispatched.
///
/// A node is recorded when it is dispatched, so a node that fails or times out is the last
/// entry of the trace carried by the error. Two runs over the same initial state with
/// deterministic transforms produce equal traces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTrace {
    nodes: Vec<String>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node_id: impl Into<String>) {
        self.nodes.push(node_id.into());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.nodes.last().map(String::as_str)
    }

    /// Node ids as string slices, convenient for assertions: `trace.node_ids() == vec!["a"]`.
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(String::as_str).collect()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n == node_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }
}

impl fmt::Display for ExecutionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nodes.join(" -> "))
    }
}
