//! Compiled graph: immutable, validated, shared across runs.
//!
//! Built by `StateGraph::compile`. Holds the nodes, the routing table (`node id -> Edge`),
//! the start node, the state schema and the engine configuration. `run` drives one
//! invocation: dispatch node, merge delta, route, repeat until `END` or a fatal condition.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::Instrument;

use crate::config::EngineConfig;
use crate::error::{RunError, RunErrorKind};
use crate::state::{FieldSet, StateContainer, StateSchema};

use super::conditional::Edge;
use super::events::NodeEvent;
use super::executor::{Deadlines, NodeEntry, NodeExecutor};
use super::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_skipped,
    log_node_start, log_route, log_state_update,
};
use super::{ExecutionTrace, RunContext, END};

pub(crate) struct GraphInner<C> {
    pub(crate) nodes: HashMap<String, NodeEntry<C>>,
    pub(crate) order: Vec<String>,
    pub(crate) edges: HashMap<String, Edge>,
    pub(crate) start: String,
    pub(crate) schema: StateSchema,
}

/// Result of a run that reached `END`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Output-schema fields only; scratch and input fields are not returned.
    pub output: StateContainer,
    pub trace: ExecutionTrace,
}

/// Executable graph. Cheap to clone; clones share the same immutable definition.
///
/// **Interaction**: Created by `StateGraph::compile`; `run` takes a per-run
/// [`RunContext`] so unrelated runs can execute concurrently over one instance.
pub struct CompiledGraph<C> {
    inner: Arc<GraphInner<C>>,
    config: EngineConfig,
}

impl<C> Clone for CompiledGraph<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config,
        }
    }
}

impl<C> fmt::Debug for CompiledGraph<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("start", &self.inner.start)
            .field("nodes", &self.inner.order)
            .field("edges", &self.inner.edges)
            .field("config", &self.config)
            .finish()
    }
}

impl<C> CompiledGraph<C> {
    pub(super) fn from_inner(inner: GraphInner<C>) -> Self {
        Self {
            inner: Arc::new(inner),
            config: EngineConfig::default(),
        }
    }

    /// Replaces the engine configuration (step limit, default deadlines).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Id of the first node dispatched by every run.
    pub fn start(&self) -> &str {
        &self.inner.start
    }

    pub fn schema(&self) -> &StateSchema {
        &self.inner.schema
    }

    /// Node ids in registration order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.inner.order.iter().map(String::as_str)
    }

    /// Outgoing edge of `node_id`.
    pub fn edge(&self, node_id: &str) -> Option<&Edge> {
        self.inner.edges.get(node_id)
    }

    /// Declared (inputs, outputs) of `node_id`.
    pub fn node_fields(&self, node_id: &str) -> Option<(&FieldSet, &FieldSet)> {
        self.inner
            .nodes
            .get(node_id)
            .map(|entry| (&entry.inputs, &entry.outputs))
    }
}

impl<C> CompiledGraph<C>
where
    C: Send + Sync + 'static,
{
    /// Runs the graph from the start node over `initial`.
    ///
    /// Returns the Output view and the trace when `END` is reached. Any other termination,
    /// including cancellation, is a [`RunError`] carrying the partial trace.
    pub async fn run(
        &self,
        initial: StateContainer,
        ctx: &RunContext<C>,
    ) -> Result<RunOutcome, RunError> {
        let span = tracing::info_span!("graph_run", run_id = %ctx.run_id());
        async {
            log_graph_start(&self.inner.start);
            let result = self.run_loop(initial, ctx).await;
            match &result {
                Ok(outcome) => log_graph_complete(&outcome.trace),
                Err(error) => log_graph_error(error),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_loop(
        &self,
        initial: StateContainer,
        ctx: &RunContext<C>,
    ) -> Result<RunOutcome, RunError> {
        let inner = &*self.inner;
        let mut trace = ExecutionTrace::new();

        if let Some(field) = inner.schema.missing_inputs(&initial).into_iter().next() {
            return Err(RunError::new(RunErrorKind::MissingInput { field }, trace));
        }

        let run_timeout = ctx.run_timeout().or(self.config.run_timeout);
        let started = Instant::now();
        let mut state = initial;
        let mut current = inner.start.clone();
        let mut step = 0usize;

        loop {
            if ctx.is_cancelled() {
                return Err(RunError::new(
                    RunErrorKind::Cancelled { node_id: current },
                    trace,
                ));
            }
            if step >= self.config.max_steps {
                let kind = RunErrorKind::StepLimitExceeded {
                    limit: self.config.max_steps,
                    node_id: current,
                };
                return Err(RunError::new(kind, trace));
            }
            let run_left = match run_timeout {
                Some(total) => {
                    let elapsed = started.elapsed();
                    if elapsed >= total {
                        let kind = RunErrorKind::RunTimeout {
                            node_id: current,
                            timeout: total,
                        };
                        return Err(RunError::new(kind, trace));
                    }
                    Some((total - elapsed, total))
                }
                None => None,
            };

            let Some(entry) = inner.nodes.get(&current) else {
                let kind = RunErrorKind::Routing {
                    node_id: trace.last().unwrap_or(inner.start.as_str()).to_string(),
                    target: current,
                };
                return Err(RunError::new(kind, trace));
            };

            step += 1;
            trace.push(current.clone());
            log_node_start(&current, step);
            ctx.emit(NodeEvent::started(ctx.run_id(), &current, step));

            let deadlines = Deadlines {
                node: entry.options.timeout.or(self.config.node_timeout),
                run: run_left,
            };
            match NodeExecutor
                .execute(&current, entry, &state, ctx, deadlines)
                .await
            {
                Ok(delta) => {
                    ctx.emit(NodeEvent::succeeded(ctx.run_id(), &current, step));
                    log_node_complete(&current, delta.len());
                    state.merge(delta);
                    log_state_update(&current, &state);
                }
                Err(kind @ RunErrorKind::NodeExecution { .. }) if entry.options.best_effort => {
                    log_node_skipped(&current, &kind);
                    ctx.emit(NodeEvent::failed(
                        ctx.run_id(),
                        &current,
                        step,
                        kind.to_string(),
                    ));
                }
                Err(kind) => {
                    ctx.emit(NodeEvent::failed(
                        ctx.run_id(),
                        &current,
                        step,
                        kind.to_string(),
                    ));
                    return Err(RunError::new(kind, trace));
                }
            }

            let next = match inner.edges.get(&current) {
                Some(Edge::Unconditional(target)) => target.clone(),
                Some(Edge::Conditional(router)) => match router.resolve(&current, &state) {
                    Ok(target) => target,
                    Err(kind) => return Err(RunError::new(kind, trace)),
                },
                None => {
                    let kind = RunErrorKind::Routing {
                        node_id: current,
                        target: END.to_string(),
                    };
                    return Err(RunError::new(kind, trace));
                }
            };
            log_route(&current, &next);

            if next == END {
                let missing = inner.schema.missing_outputs(&state);
                if !missing.is_empty() {
                    let kind = RunErrorKind::IncompleteOutput {
                        node_id: current,
                        missing,
                    };
                    return Err(RunError::new(kind, trace));
                }
                return Ok(RunOutcome {
                    output: inner.schema.output_view(&state),
                    trace,
                });
            }
            current = next;
        }
    }
}
