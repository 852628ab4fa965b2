//! AgentRunner: compiled agent graph, typed input and output.

use serde::Serialize;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::error::RunError;
use crate::graph::{CompilationError, CompiledGraph, ExecutionTrace, RunContext};
use crate::state::{StateContainer, StateDelta, StateError};

use super::capability::AgentContext;
use super::graph::{
    compile_agent_graph, ANSWER, CONVERSATION, TOOL_CATALOG, TOOL_CHOICE, TOOL_RESULT,
};
use super::state::{Answer, Conversation, ToolChoice, ToolDescriptor, ToolResult};

/// Input fields of one agent run.
#[derive(Debug, Clone)]
pub struct AgentInput {
    pub conversation: Conversation,
    pub tool_catalog: Vec<ToolDescriptor>,
}

impl AgentInput {
    pub fn new(conversation: Conversation, tool_catalog: Vec<ToolDescriptor>) -> Self {
        Self {
            conversation,
            tool_catalog,
        }
    }

    fn into_state(self) -> Result<StateContainer, StateError> {
        let delta = StateDelta::new()
            .set(CONVERSATION, &self.conversation)?
            .set(TOOL_CATALOG, &self.tool_catalog)?;
        Ok(StateContainer::from_delta(delta))
    }
}

/// Output of a completed agent run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentOutput {
    pub answer: Answer,
    pub tool_choice: ToolChoice,
    /// `None` when the selection answered directly.
    pub tool_result: Option<ToolResult>,
    pub trace: ExecutionTrace,
}

impl AgentOutput {
    fn from_output(output: &StateContainer, trace: ExecutionTrace) -> Result<Self, StateError> {
        Ok(Self {
            answer: output.get(ANSWER)?,
            tool_choice: output.get(TOOL_CHOICE)?,
            tool_result: output.get_opt(TOOL_RESULT)?,
            trace,
        })
    }
}

#[derive(Debug, Error)]
pub enum AgentRunError {
    #[error("agent graph failed to compile: {0}")]
    Compilation(#[from] CompilationError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("agent state: {0}")]
    State(#[from] StateError),
}

impl AgentRunError {
    pub fn run_error(&self) -> Option<&RunError> {
        match self {
            AgentRunError::Run(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.run_error().is_some_and(RunError::is_cancelled)
    }
}

/// Runs the agent flow. Holds one compiled graph shared by every run.
#[derive(Debug, Clone)]
pub struct AgentRunner {
    graph: CompiledGraph<AgentContext>,
}

impl AgentRunner {
    pub fn new() -> Result<Self, CompilationError> {
        Ok(Self::from_graph(compile_agent_graph()?))
    }

    /// Uses a custom compiled graph with the same field contract.
    pub fn from_graph(graph: CompiledGraph<AgentContext>) -> Self {
        Self { graph }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.graph = self.graph.with_config(config);
        self
    }

    pub fn graph(&self) -> &CompiledGraph<AgentContext> {
        &self.graph
    }

    pub async fn run(
        &self,
        input: AgentInput,
        ctx: &RunContext<AgentContext>,
    ) -> Result<AgentOutput, AgentRunError> {
        let outcome = self.graph.run(input.into_state()?, ctx).await?;
        Ok(AgentOutput::from_output(&outcome.output, outcome.trace)?)
    }
}
