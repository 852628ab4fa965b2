//! One agent run from the command line: build input, wire observers, run, report.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use toolgraph::agent::{
    AgentInput, AgentOutput, AgentRunError, AgentRunner, Conversation, ToolCall,
};
use toolgraph::{
    ChannelObserver, CompilationError, ConfigError, EngineConfig, NodeEvent, RunContext,
};

use crate::demo;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("config: {0}")]
    Load(#[from] config::LoadError),
    #[error(transparent)]
    Compile(#[from] CompilationError),
    #[error(transparent)]
    Agent(#[from] AgentRunError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options of `toolgraph run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub query: String,
    /// Skip selection and call this tool with `{"query": <query>}`.
    pub force_tool: Option<String>,
    /// Overrides the configured step limit.
    pub max_steps: Option<usize>,
    /// Print answer chunks as they arrive.
    pub stream: bool,
}

/// Result of a completed run, as printed by `--json`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    #[serde(flatten)]
    pub output: AgentOutput,
    pub events: Vec<NodeEvent>,
}

/// A failed run together with the events observed before it stopped.
#[derive(Debug)]
pub struct RunFailure {
    pub error: CliError,
    pub events: Vec<NodeEvent>,
}

impl From<CompilationError> for RunFailure {
    fn from(error: CompilationError) -> Self {
        Self {
            error: error.into(),
            events: Vec::new(),
        }
    }
}

impl From<ConfigError> for RunFailure {
    fn from(error: ConfigError) -> Self {
        Self {
            error: error.into(),
            events: Vec::new(),
        }
    }
}

/// Runs the demo agent once.
///
/// With `chunks` set, answer chunks are forwarded there while the run progresses.
pub async fn run_query(
    opts: &RunOptions,
    engine: EngineConfig,
    cancel: CancellationToken,
    chunks: Option<mpsc::UnboundedSender<String>>,
) -> Result<RunReport, RunFailure> {
    let engine = match opts.max_steps {
        Some(max_steps) => engine.try_with_max_steps("--max-steps", max_steps)?,
        None => engine,
    };
    let runner = AgentRunner::new()?.with_config(engine);

    let mut agent = demo::context(opts.stream);
    if let Some(tx) = chunks {
        agent = agent.with_answer_channel(tx);
    }
    let (observer, mut events_rx) = ChannelObserver::channel();
    let ctx = RunContext::new(agent)
        .with_cancellation(cancel)
        .with_observer(Arc::new(observer));

    let mut conversation = Conversation::from_query(opts.query.clone());
    if let Some(tool) = &opts.force_tool {
        let call = ToolCall::new(tool.clone(), json!({ "query": opts.query }));
        conversation = conversation.with_forced_tool(call);
    }
    let input = AgentInput::new(conversation, demo::catalog());

    tracing::info!(run_id = %ctx.run_id(), "Starting agent run");
    let result = runner.run(input, &ctx).await;

    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }
    match result {
        Ok(output) => Ok(RunReport {
            run_id: ctx.run_id().to_string(),
            output,
            events,
        }),
        Err(error) => Err(RunFailure {
            error: error.into(),
            events,
        }),
    }
}

/// Engine settings from the XDG `[engine]` table and env.
pub fn engine_config(app_name: &str) -> Result<EngineConfig, CliError> {
    Ok(EngineConfig::load(app_name)?)
}
