//! Shared nodes and helpers for StateGraph integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use toolgraph::{BoxError, FnNode, Node, RunContext, StateContainer, StateDelta};

/// Node that writes a constant into one field.
pub fn set_field(field: &'static str, value: Value) -> Arc<dyn Node<()>> {
    Arc::new(FnNode::new(move |_s: &StateContainer| {
        Ok(StateDelta::new().with_value(field, value.clone()))
    }))
}

/// Node that writes nothing.
pub fn noop() -> Arc<dyn Node<()>> {
    Arc::new(FnNode::new(|_s: &StateContainer| Ok(StateDelta::new())))
}

/// Builds an initial state from `(field, value)` pairs.
pub fn state(pairs: &[(&str, Value)]) -> StateContainer {
    let delta = pairs
        .iter()
        .fold(StateDelta::new(), |d, (k, v)| d.with_value(*k, v.clone()));
    StateContainer::from_delta(delta)
}

/// Increments the integer field `count` (starting at 0) and counts its own invocations.
pub struct CountingNode {
    pub calls: AtomicUsize,
}

impl CountingNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Node<()> for CountingNode {
    async fn run(
        &self,
        state: &StateContainer,
        _ctx: &RunContext<()>,
    ) -> Result<StateDelta, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let count: i64 = state.get_opt("count")?.unwrap_or(0);
        Ok(StateDelta::new().set("count", count + 1)?)
    }
}

/// Sleeps, then writes `slept = true`.
pub struct SleepyNode(pub Duration);

#[async_trait]
impl Node<()> for SleepyNode {
    async fn run(
        &self,
        _state: &StateContainer,
        _ctx: &RunContext<()>,
    ) -> Result<StateDelta, BoxError> {
        tokio::time::sleep(self.0).await;
        Ok(StateDelta::new().set("slept", true)?)
    }
}

/// Error type returned by [`FailingNode`], so tests can downcast the cause.
#[derive(Debug, thiserror::Error)]
#[error("node exploded: {0}")]
pub struct Exploded(pub String);

/// Always fails with [`Exploded`].
pub struct FailingNode(pub &'static str);

#[async_trait]
impl Node<()> for FailingNode {
    async fn run(
        &self,
        _state: &StateContainer,
        _ctx: &RunContext<()>,
    ) -> Result<StateDelta, BoxError> {
        Err(Box::new(Exploded(self.0.to_string())))
    }
}
