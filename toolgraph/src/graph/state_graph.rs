//! State graph builder: nodes with declared fields, explicit edges, conditional edges.
//!
//! Add nodes with `add_node`, then wire them with `add_edge(from, to)` using `START` and
//! `END` for entry and exit, or `add_conditional_edge` to pick the next node from state.
//! Endpoints must already be registered when an edge is added. `compile` validates the
//! whole definition and returns an immutable [`CompiledGraph`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use toolgraph::graph::{FnNode, StateGraph, END, START};
//! use toolgraph::state::{fields, StateContainer, StateDelta, StateSchema};
//!
//! let mut graph = StateGraph::<()>::new()
//!     .with_schema(StateSchema::new(fields(["x"]), fields(["y"])));
//! let double = FnNode::new(|s: &StateContainer| {
//!     let x: i64 = s.get("x")?;
//!     Ok(StateDelta::new().with_value("y", json!(x * 2)))
//! });
//! graph
//!     .add_node("double", Arc::new(double), fields(["x"]), fields(["y"]))?
//!     .add_edge(START, "double")?
//!     .add_edge("double", END)?;
//! let compiled = graph.compile()?;
//! assert_eq!(compiled.start(), "double");
//! # Ok::<(), toolgraph::graph::CompilationError>(())
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::state::{FieldSet, StateContainer, StateError, StateSchema};

use super::compile_error::CompilationError;
use super::compiled::{CompiledGraph, GraphInner};
use super::conditional::{ConditionalRouter, Edge};
use super::executor::NodeEntry;
use super::node::{Node, NodeOptions};

/// Sentinel for graph entry: use as `from` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit (the terminal): use as a target.
pub const END: &str = "__end__";

/// Graph definition under construction.
///
/// Generic over the external context type `C` handed to every node. Each builder method
/// validates eagerly and returns `&mut Self` for chaining with `?`.
///
/// **Interaction**: Accepts `Arc<dyn Node<C>>`; produces `CompiledGraph<C>`.
pub struct StateGraph<C> {
    nodes: HashMap<String, NodeEntry<C>>,
    /// Registration order; drives deterministic error reporting and visualization.
    order: Vec<String>,
    edges: HashMap<String, Edge>,
    start: Option<String>,
    schema: StateSchema,
}

impl<C> Default for StateGraph<C>
where
    C: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> StateGraph<C>
where
    C: Send + Sync + 'static,
{
    /// Empty graph with an empty Input/Output schema.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            start: None,
            schema: StateSchema::default(),
        }
    }

    /// Declares the graph's Input and Output fields.
    pub fn with_schema(mut self, schema: StateSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Registers a node with its declared input and output fields.
    ///
    /// Fails with `DuplicateNodeId` if `id` is already registered or is a sentinel.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        node: Arc<dyn Node<C>>,
        inputs: FieldSet,
        outputs: FieldSet,
    ) -> Result<&mut Self, CompilationError> {
        self.add_node_with_options(id, node, inputs, outputs, NodeOptions::default())
    }

    /// Like [`add_node`](Self::add_node), with best-effort and timeout options.
    pub fn add_node_with_options(
        &mut self,
        id: impl Into<String>,
        node: Arc<dyn Node<C>>,
        inputs: FieldSet,
        outputs: FieldSet,
        options: NodeOptions,
    ) -> Result<&mut Self, CompilationError> {
        let id = id.into();
        if id == START || id == END || self.nodes.contains_key(&id) {
            return Err(CompilationError::DuplicateNodeId(id));
        }
        self.nodes.insert(
            id.clone(),
            NodeEntry {
                node,
                inputs,
                outputs,
                options,
            },
        );
        self.order.push(id);
        Ok(self)
    }

    /// Adds an unconditional edge. `add_edge(START, id)` declares the start node.
    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<&mut Self, CompilationError> {
        let (from, to) = (from.into(), to.into());
        if from == START {
            if !self.nodes.contains_key(&to) {
                return Err(CompilationError::UnknownEndpoint(to));
            }
            if self.start.is_some() {
                return Err(CompilationError::MultipleStart(to));
            }
            self.start = Some(to);
            return Ok(self);
        }
        self.check_source(&from)?;
        self.check_target(&to)?;
        if self.edges.contains_key(&from) {
            return Err(CompilationError::DuplicateEdge(from));
        }
        self.edges.insert(from, Edge::Unconditional(to));
        Ok(self)
    }

    /// Adds a conditional edge: after `source` runs, `predicate(state)` picks one of
    /// `targets` (node ids or `END`).
    ///
    /// The predicate must be a pure function of state. Returning an id outside `targets`
    /// fails the run with a routing error.
    pub fn add_conditional_edge<F, I, T>(
        &mut self,
        source: impl Into<String>,
        predicate: F,
        targets: I,
    ) -> Result<&mut Self, CompilationError>
    where
        F: Fn(&StateContainer) -> Result<String, StateError> + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let source = source.into();
        self.check_source(&source)?;
        let targets: std::collections::BTreeSet<String> =
            targets.into_iter().map(Into::into).collect();
        if targets.is_empty() {
            return Err(CompilationError::EmptyTargetSet(source));
        }
        for target in &targets {
            self.check_target(target)?;
        }
        if self.edges.contains_key(&source) {
            return Err(CompilationError::DuplicateEdge(source));
        }
        let router = ConditionalRouter::new(Arc::new(predicate), targets);
        self.edges.insert(source, Edge::Conditional(router));
        Ok(self)
    }

    fn check_source(&self, id: &str) -> Result<(), CompilationError> {
        if self.nodes.contains_key(id) {
            Ok(())
        } else {
            Err(CompilationError::UnknownEndpoint(id.to_string()))
        }
    }

    fn check_target(&self, id: &str) -> Result<(), CompilationError> {
        if id == END || self.nodes.contains_key(id) {
            Ok(())
        } else {
            Err(CompilationError::UnknownEndpoint(id.to_string()))
        }
    }

    /// Validates the definition and builds the executable graph.
    ///
    /// Checks, in order: a start node exists; every node has an outgoing edge; every node
    /// is reachable from start and `END` is reachable; each node input is a graph input or
    /// produced by a node that can reach it; each Output field can be produced.
    pub fn compile(self) -> Result<CompiledGraph<C>, CompilationError> {
        let start = self.start.clone().ok_or(CompilationError::MissingStart)?;

        if let Some(id) = self.order.iter().find(|id| !self.edges.contains_key(*id)) {
            return Err(CompilationError::MissingOutgoingEdge(id.clone()));
        }

        self.check_reachability(&start)?;
        self.check_schema()?;

        Ok(CompiledGraph::from_inner(GraphInner {
            nodes: self.nodes,
            order: self.order,
            edges: self.edges,
            start,
            schema: self.schema,
        }))
    }

    fn check_reachability(&self, start: &str) -> Result<(), CompilationError> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue = VecDeque::from([start]);
        let mut reaches_end = false;
        visited.insert(start);
        while let Some(id) = queue.pop_front() {
            let Some(edge) = self.edges.get(id) else {
                continue;
            };
            for target in edge.targets() {
                if target == END {
                    reaches_end = true;
                } else if visited.insert(target) {
                    queue.push_back(target);
                }
            }
        }
        if let Some(id) = self.order.iter().find(|id| !visited.contains(id.as_str())) {
            return Err(CompilationError::UnreachableNode(id.clone()));
        }
        if !reaches_end {
            return Err(CompilationError::NoTerminalPath);
        }
        Ok(())
    }

    fn check_schema(&self) -> Result<(), CompilationError> {
        let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
        for (source, edge) in &self.edges {
            for target in edge.targets() {
                if target != END {
                    predecessors.entry(target).or_default().push(source.as_str());
                }
            }
        }

        for id in &self.order {
            let entry = &self.nodes[id];
            let upstream = upstream_of(id, &predecessors);
            for field in &entry.inputs {
                let satisfied = self.schema.input().contains(field)
                    || upstream
                        .iter()
                        .any(|up| self.nodes[*up].outputs.contains(field));
                if !satisfied {
                    return Err(CompilationError::UnsatisfiedInput {
                        node: id.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        for field in self.schema.output() {
            let producible = self.schema.input().contains(field)
                || self.nodes.values().any(|e| e.outputs.contains(field));
            if !producible {
                return Err(CompilationError::UnproducibleOutput(field.clone()));
            }
        }
        Ok(())
    }
}

/// Every node with a path to `id` (includes `id` itself only when it lies on a cycle).
fn upstream_of<'a>(id: &str, predecessors: &HashMap<&str, Vec<&'a str>>) -> HashSet<&'a str> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut queue: VecDeque<&'a str> = predecessors
        .get(id)
        .map(|p| p.iter().copied().collect())
        .unwrap_or_default();
    while let Some(node) = queue.pop_front() {
        if seen.insert(node) {
            if let Some(preds) = predecessors.get(node) {
                queue.extend(preds.iter().copied());
            }
        }
    }
    seen
}
