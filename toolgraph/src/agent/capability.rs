//! External capabilities the agent flow calls: selection, tools, synthesis.
//!
//! The flow depends only on these traits; concrete implementations (an LLM-backed
//! selector, MCP tools, ...) live with the caller. [`super::mock`] has simple ones.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::BoxError;

use super::state::{Conversation, SelectionRequest, ToolCall, ToolResult};

/// An answer, either complete or as a lazy, finite, non-restartable chunk stream.
pub enum AnswerSource {
    Text(String),
    Stream(BoxStream<'static, Result<String, BoxError>>),
}

impl AnswerSource {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn stream<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<String, BoxError>> + Send + 'static,
    {
        Self::Stream(chunks.boxed())
    }
}

impl fmt::Debug for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerSource::Text(text) => f.debug_tuple("Text").field(text).finish(),
            AnswerSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Result of selection: answer directly, or call a tool.
#[derive(Debug)]
pub enum Selection {
    Answer(AnswerSource),
    ToolCall(ToolCall),
}

/// Chooses between answering directly and calling one of the offered tools.
#[async_trait]
pub trait ToolSelector: Send + Sync {
    async fn select(&self, request: &SelectionRequest) -> Result<Selection, BoxError>;
}

/// Per-call context passed to tools.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub run_id: Uuid,
    /// The run's token; long-running tools may stop early when it is signalled.
    pub cancellation: CancellationToken,
}

/// An invocable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(
        &self,
        arguments: &Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolExecutionError>;
}

/// Resolves tool names to implementations.
pub trait ToolProvider: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolExecutionError>;
}

/// Turns a tool result into the final answer.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        result: &ToolResult,
        conversation: &Conversation,
    ) -> Result<AnswerSource, BoxError>;
}

/// Tool lookup or invocation failure. Surfaces as the cause of `NodeExecution` on
/// `CallingTool`.
#[derive(Debug, Error)]
pub enum ToolExecutionError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("tool {tool} failed: {reason}")]
    Failed { tool: String, reason: String },
}

/// Failures of the flow's own nodes around the capabilities.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("conversation has no user message")]
    EmptyConversation,
    #[error("forced tool is not an enabled catalog entry: {0}")]
    ForcedToolUnavailable(String),
    #[error("selector chose a tool that was not offered: {0}")]
    UnknownToolSelected(String),
    #[error("tool choice holds no tool call")]
    NoToolCall,
    #[error("answer stream failed: {0}")]
    Stream(#[source] BoxError),
}

/// External context of the agent graph: the capabilities plus an optional sink for
/// answer chunks.
#[derive(Clone)]
pub struct AgentContext {
    pub selector: Arc<dyn ToolSelector>,
    pub tools: Arc<dyn ToolProvider>,
    pub synthesizer: Arc<dyn Synthesizer>,
    /// Receives answer chunks as they are produced.
    pub answer_tx: Option<mpsc::UnboundedSender<String>>,
}

impl AgentContext {
    pub fn new(
        selector: Arc<dyn ToolSelector>,
        tools: Arc<dyn ToolProvider>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            selector,
            tools,
            synthesizer,
            answer_tx: None,
        }
    }

    pub fn with_answer_channel(mut self, tx: mpsc::UnboundedSender<String>) -> Self {
        self.answer_tx = Some(tx);
        self
    }
}

impl fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentContext")
            .field("answer_tx", &self.answer_tx.is_some())
            .finish_non_exhaustive()
    }
}
