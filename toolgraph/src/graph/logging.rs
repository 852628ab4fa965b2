//! Logging helpers for graph execution.
//!
//! Structured `tracing` events for run start/end, node dispatch, state merges and routing
//! decisions. They run inside the `graph_run` span, so `run_id` is attached by the span.

use crate::error::{RunError, RunErrorKind};
use crate::state::StateContainer;

use super::ExecutionTrace;

/// Log graph execution start.
pub fn log_graph_start(start: &str) {
    tracing::info!(start = start, "Starting graph execution");
}

/// Log node execution start.
pub fn log_node_start(node_id: &str, step: usize) {
    tracing::debug!(node_id = node_id, step = step, "Starting node execution");
}

/// Log node execution completion with the number of fields it wrote.
pub fn log_node_complete(node_id: &str, fields: usize) {
    tracing::debug!(node_id = node_id, fields = fields, "Node execution complete");
}

/// Log a best-effort node failure that was replaced by an empty delta.
pub fn log_node_skipped(node_id: &str, error: &RunErrorKind) {
    tracing::warn!(node_id = node_id, %error, "Best-effort node failed; continuing");
}

/// Log state after a merge.
pub fn log_state_update(node_id: &str, state: &StateContainer) {
    tracing::trace!(node_id = node_id, state = ?state, "State updated");
}

/// Log a routing decision.
pub fn log_route(from: &str, to: &str) {
    tracing::debug!(from = from, to = to, "Routing");
}

/// Log graph execution completion.
pub fn log_graph_complete(trace: &ExecutionTrace) {
    tracing::info!(steps = trace.len(), %trace, "Graph execution complete");
}

/// Log graph execution error. Cancellation is logged at info level.
pub fn log_graph_error(error: &RunError) {
    if error.is_cancelled() {
        tracing::info!(%error, "Graph execution cancelled");
    } else {
        tracing::error!(%error, "Graph execution error");
    }
}
