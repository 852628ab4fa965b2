//! Closure node: wraps a synchronous `Fn(&StateContainer) -> Result<StateDelta, BoxError>`.
//!
//! Implements `Node<C>` for any context type. Useful for small pure steps (defaults,
//! reshaping fields) and for tests. Interaction: `StateGraph::add_node`, `Node::run`.

use async_trait::async_trait;

use crate::error::BoxError;
use crate::state::{StateContainer, StateDelta};

use super::{Node, RunContext};

/// A node whose transform is a plain closure over the current state.
///
/// The context is not passed to the closure; write a `Node` impl when the step needs
/// external capabilities or async work.
pub struct FnNode<F> {
    f: F,
}

impl<F> FnNode<F>
where
    F: Fn(&StateContainer) -> Result<StateDelta, BoxError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<C, F> Node<C> for FnNode<F>
where
    C: Send + Sync + 'static,
    F: Fn(&StateContainer) -> Result<StateDelta, BoxError> + Send + Sync,
{
    async fn run(
        &self,
        state: &StateContainer,
        _ctx: &RunContext<C>,
    ) -> Result<StateDelta, BoxError> {
        (self.f)(state)
    }
}
