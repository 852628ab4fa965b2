//! Node executor: runs one node transform under its deadline and wraps failures.
//!
//! The effective deadline is the shorter of the node timeout and the time left on the
//! run; which one was binding decides between `NodeTimeout` and `RunTimeout`. A delta
//! that writes outside the node's declared outputs is rejected as `NodeExecution`.

use std::sync::Arc;
use std::time::Duration;

use crate::error::RunErrorKind;
use crate::state::{FieldSet, StateContainer, StateDelta, StateError};

use super::{Node, NodeOptions, RunContext};

/// A registered node: transform, declared fields and build-time options.
pub(crate) struct NodeEntry<C> {
    pub(crate) node: Arc<dyn Node<C>>,
    pub(crate) inputs: FieldSet,
    pub(crate) outputs: FieldSet,
    pub(crate) options: NodeOptions,
}

impl<C> Clone for NodeEntry<C> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            options: self.options,
        }
    }
}

/// Time budget for one dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Deadlines {
    /// Per-node timeout (node option or engine default).
    pub(crate) node: Option<Duration>,
    /// Time left on the run, and the configured run timeout for error reporting.
    pub(crate) run: Option<(Duration, Duration)>,
}

enum Binding {
    Node(Duration),
    Run(Duration, Duration),
}

impl Deadlines {
    fn binding(&self) -> Option<Binding> {
        match (self.node, self.run) {
            (None, None) => None,
            (Some(node), None) => Some(Binding::Node(node)),
            (None, Some((left, total))) => Some(Binding::Run(left, total)),
            (Some(node), Some((left, total))) => {
                if left <= node {
                    Some(Binding::Run(left, total))
                } else {
                    Some(Binding::Node(node))
                }
            }
        }
    }
}

/// Executes single nodes for the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeExecutor;

impl NodeExecutor {
    /// Runs `entry` against `state`.
    ///
    /// Returns the node's delta, or the run error describing the failure. Best-effort
    /// handling is left to the engine so that it can log and emit events.
    pub(crate) async fn execute<C>(
        &self,
        node_id: &str,
        entry: &NodeEntry<C>,
        state: &StateContainer,
        ctx: &RunContext<C>,
        deadlines: Deadlines,
    ) -> Result<StateDelta, RunErrorKind>
    where
        C: Send + Sync + 'static,
    {
        let fut = entry.node.run(state, ctx);
        let result = match deadlines.binding() {
            None => fut.await,
            Some(Binding::Node(timeout)) => match tokio::time::timeout(timeout, fut).await {
                Ok(r) => r,
                Err(_) => {
                    return Err(RunErrorKind::NodeTimeout {
                        node_id: node_id.to_string(),
                        timeout,
                    })
                }
            },
            Some(Binding::Run(left, total)) => match tokio::time::timeout(left, fut).await {
                Ok(r) => r,
                Err(_) => {
                    return Err(RunErrorKind::RunTimeout {
                        node_id: node_id.to_string(),
                        timeout: total,
                    })
                }
            },
        };

        let delta = result.map_err(|cause| RunErrorKind::NodeExecution {
            node_id: node_id.to_string(),
            cause,
        })?;

        if let Some(field) = delta.field_names().find(|f| !entry.outputs.contains(*f)) {
            return Err(RunErrorKind::NodeExecution {
                node_id: node_id.to_string(),
                cause: Box::new(StateError::UndeclaredOutput {
                    field: field.to_string(),
                }),
            });
        }
        Ok(delta)
    }
}
