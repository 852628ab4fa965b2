//! State graph: nodes with declared fields, explicit and conditional edges, compile and run.
//!
//! [`StateGraph`] is the builder; [`StateGraph::compile`] validates it into an immutable
//! [`CompiledGraph`]; [`CompiledGraph::run`] executes one run against a [`RunContext`].

mod compile_error;
mod compiled;
mod conditional;
mod events;
mod executor;
mod fn_node;
mod logging;
mod node;
mod run_context;
mod state_graph;
mod trace;
mod visualization;

pub use compile_error::CompilationError;
pub use compiled::{CompiledGraph, RunOutcome};
pub use conditional::{ConditionalRouter, Edge, RoutePredicate};
pub use events::{ChannelObserver, NodeEvent, NodeEventKind, NodeObserver};
pub use executor::NodeExecutor;
pub use fn_node::FnNode;
pub use logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_skipped,
    log_node_start, log_route, log_state_update,
};
pub use node::{Node, NodeOptions};
pub use run_context::RunContext;
pub use state_graph::{StateGraph, END, START};
pub use trace::ExecutionTrace;
pub use visualization::{generate_dot, generate_text};
