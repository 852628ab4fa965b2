//! Edges and conditional routing.
//!
//! Every node has exactly one [`Edge`]: `Unconditional(target)` or
//! `Conditional(router)`. A [`ConditionalRouter`] evaluates a predicate over the
//! post-execution state and checks the result against the declared target set.
//!
//! **Interaction**: Built by `StateGraph::add_edge` / `add_conditional_edge`; consulted by
//! the `CompiledGraph::run` loop after each node.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::RunErrorKind;
use crate::state::{StateContainer, StateError};

/// Routing predicate: a deterministic, pure function of state returning a target id
/// (a node id or `END`).
///
/// Predicates must not perform I/O so a run can be replayed from its trace.
pub type RoutePredicate = Arc<dyn Fn(&StateContainer) -> Result<String, StateError> + Send + Sync>;

/// Predicate plus the finite set of targets it may return.
#[derive(Clone)]
pub struct ConditionalRouter {
    predicate: RoutePredicate,
    targets: BTreeSet<String>,
}

impl ConditionalRouter {
    pub fn new(predicate: RoutePredicate, targets: BTreeSet<String>) -> Self {
        Self { predicate, targets }
    }

    /// Declared targets (node ids and possibly `END`).
    pub fn targets(&self) -> &BTreeSet<String> {
        &self.targets
    }

    /// Resolves the next target for `node_id` from `state`.
    ///
    /// A predicate error becomes `RoutingPredicate`; a result outside the declared targets
    /// becomes `Routing`. Neither is coerced to a default.
    pub fn resolve(&self, node_id: &str, state: &StateContainer) -> Result<String, RunErrorKind> {
        let target = (self.predicate)(state).map_err(|cause| RunErrorKind::RoutingPredicate {
            node_id: node_id.to_string(),
            cause,
        })?;
        if self.targets.contains(&target) {
            Ok(target)
        } else {
            Err(RunErrorKind::Routing {
                node_id: node_id.to_string(),
                target,
            })
        }
    }
}

impl fmt::Debug for ConditionalRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalRouter")
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

/// How to determine the next node after a given node runs.
#[derive(Debug, Clone)]
pub enum Edge {
    /// Single fixed next node (or END).
    Unconditional(String),
    /// Next node is chosen from state by the router.
    Conditional(ConditionalRouter),
}

impl Edge {
    /// Every target this edge may lead to.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Edge::Unconditional(target) => vec![target.as_str()],
            Edge::Conditional(router) => router.targets.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Edge::Conditional(_))
    }
}
