//! # toolgraph
//!
//! A small declarative graph engine for tool-using agents. Named nodes and the edges
//! between them (including conditional edges chosen from runtime state) are compiled into
//! an immutable state machine, then run against a per-run state that nodes extend field
//! by field.
//!
//! ## Design principles
//!
//! - **Validated up front**: [`StateGraph::compile`] checks start node, outgoing edges,
//!   reachability, a path to [`END`] and input/output schema compatibility. A compiled
//!   graph never fails for structural reasons during a run.
//! - **Monotonic state**: nodes return a [`StateDelta`]; the engine merges it into the
//!   run's [`StateContainer`]. Fields are added or overwritten, never removed.
//! - **One path per run**: nodes of one run execute strictly one after another, producing
//!   a deterministic [`ExecutionTrace`]. A [`CompiledGraph`] is shared read-only by any
//!   number of concurrent runs.
//! - **Explicit failure**: every run that does not reach `END` returns a [`RunError`]
//!   with the node id, the partial trace and the original cause. No retries.
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledGraph`], [`Node`], [`FnNode`], [`RunContext`],
//!   [`NodeEvent`] observers, [`generate_dot`] / [`generate_text`].
//! - [`state`]: [`StateContainer`], [`StateDelta`], [`StateSchema`].
//! - [`agent`]: the reference flow (PreparingInput → ChoosingTool → CallingTool →
//!   SynthesizingResponse), its capability traits and [`AgentRunner`].
//! - [`config`]: [`EngineConfig`] (step limit and default deadlines from env / config.toml).
//! - [`error`]: [`RunError`], [`RunErrorKind`], [`BoxError`].
//! - [`message`]: [`Message`] (System / User / Assistant).

pub mod agent;
pub mod config;
pub mod error;
pub mod graph;
pub mod message;
pub mod state;

pub use agent::{
    AgentContext, AgentInput, AgentOutput, AgentRunError, AgentRunner, Conversation, ToolCall,
    ToolChoice, ToolDescriptor,
};
pub use config::{ConfigError, EngineConfig};
pub use error::{BoxError, RunError, RunErrorKind};
pub use graph::{
    generate_dot, generate_text, ChannelObserver, CompilationError, CompiledGraph, Edge,
    ExecutionTrace, FnNode, Node, NodeEvent, NodeEventKind, NodeObserver, NodeOptions,
    RunContext, RunOutcome, StateGraph, END, START,
};
pub use message::Message;
pub use state::{fields, FieldSet, StateContainer, StateDelta, StateError, StateSchema};
