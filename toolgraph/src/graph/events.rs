//! Node lifecycle events, independent of logging.
//!
//! The engine emits one `Started` and one `Succeeded`/`Failed` event per node dispatch to
//! the observer set on [`RunContext`](super::RunContext). Observers run synchronously on
//! the run's task; keep them cheap (forward to a channel with [`ChannelObserver`]).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Phase of a node dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum NodeEventKind {
    Started,
    Succeeded,
    /// The transform failed or timed out; `error` is the rendered error.
    Failed { error: String },
}

/// One observability event: which node, which step of which run, when, and the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeEvent {
    pub run_id: Uuid,
    pub node_id: String,
    /// 1-based dispatch number within the run.
    pub step: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: NodeEventKind,
}

impl NodeEvent {
    pub fn started(run_id: Uuid, node_id: impl Into<String>, step: usize) -> Self {
        Self::at_now(run_id, node_id, step, NodeEventKind::Started)
    }

    pub fn succeeded(run_id: Uuid, node_id: impl Into<String>, step: usize) -> Self {
        Self::at_now(run_id, node_id, step, NodeEventKind::Succeeded)
    }

    pub fn failed(
        run_id: Uuid,
        node_id: impl Into<String>,
        step: usize,
        error: impl Into<String>,
    ) -> Self {
        Self::at_now(
            run_id,
            node_id,
            step,
            NodeEventKind::Failed {
                error: error.into(),
            },
        )
    }

    fn at_now(run_id: Uuid, node_id: impl Into<String>, step: usize, kind: NodeEventKind) -> Self {
        Self {
            run_id,
            node_id: node_id.into(),
            step,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.kind, NodeEventKind::Failed { .. })
    }
}

/// Receives node events.
pub trait NodeObserver: Send + Sync {
    fn on_event(&self, event: &NodeEvent);
}

impl<F> NodeObserver for F
where
    F: Fn(&NodeEvent) + Send + Sync,
{
    fn on_event(&self, event: &NodeEvent) {
        self(event)
    }
}

/// Forwards events to an unbounded channel; a closed receiver drops events silently.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<NodeEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<NodeEvent>) -> Self {
        Self { tx }
    }

    /// Creates an observer together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NodeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NodeObserver for ChannelObserver {
    fn on_event(&self, event: &NodeEvent) {
        let _ = self.tx.send(event.clone());
    }
}
