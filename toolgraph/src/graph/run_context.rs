//! Run context passed into nodes.
//!
//! Holds the external context value `C`, the run id, the cooperative cancellation token,
//! an optional per-run timeout and an optional [`NodeObserver`]. One `RunContext` belongs
//! to one run; the compiled graph itself carries no per-run data.
//!
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use toolgraph::graph::RunContext;
//!
//! let token = CancellationToken::new();
//! let ctx = RunContext::new("deps")
//!     .with_cancellation(token.clone())
//!     .with_timeout(Duration::from_secs(30));
//! assert!(!ctx.is_cancelled());
//! token.cancel();
//! assert!(ctx.is_cancelled());
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::events::{NodeEvent, NodeObserver};

/// Per-run execution context.
pub struct RunContext<C> {
    context: C,
    run_id: Uuid,
    cancel: CancellationToken,
    run_timeout: Option<Duration>,
    observer: Option<Arc<dyn NodeObserver>>,
}

impl<C> RunContext<C> {
    /// Creates a context with a fresh run id and an unsignalled token.
    pub fn new(context: C) -> Self {
        Self {
            context,
            run_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            run_timeout: None,
            observer: None,
        }
    }

    /// Uses `token` for cooperative cancellation; keep a clone to signal it.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Deadline for the whole run; overrides the engine's configured run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Receives a start/end event for every node dispatch.
    pub fn with_observer(mut self, observer: Arc<dyn NodeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// The external context (capabilities, clients) shared by the nodes of this run.
    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout
    }

    pub(crate) fn emit(&self, event: NodeEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for RunContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("context", &self.context)
            .field("run_id", &self.run_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("run_timeout", &self.run_timeout)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
