//! Wiring of the agent flow.
//!
//! ```text
//! START -> PreparingInput -> ChoosingTool -> { CallingTool | END }
//! CallingTool -> SynthesizingResponse -> END
//! ```

use std::sync::Arc;

use crate::graph::{CompilationError, CompiledGraph, StateGraph, END, START};
use crate::state::{fields, StateSchema};

use super::capability::AgentContext;
use super::nodes::{
    route_tool_choice, CallingToolNode, ChoosingToolNode, PreparingInputNode,
    SynthesizingResponseNode,
};

pub const PREPARING_INPUT: &str = "PreparingInput";
pub const CHOOSING_TOOL: &str = "ChoosingTool";
pub const CALLING_TOOL: &str = "CallingTool";
pub const SYNTHESIZING_RESPONSE: &str = "SynthesizingResponse";

/// Input: [`Conversation`](super::Conversation).
pub const CONVERSATION: &str = "conversation";
/// Input: `Vec<ToolDescriptor>`.
pub const TOOL_CATALOG: &str = "tool_catalog";
/// Scratch: [`SelectionRequest`](super::SelectionRequest).
pub const SELECTION_REQUEST: &str = "selection_request";
/// Output: [`ToolChoice`](super::ToolChoice).
pub const TOOL_CHOICE: &str = "tool_choice";
/// Output: [`Answer`](super::Answer).
pub const ANSWER: &str = "answer";
/// Output: `Option<ToolResult>` (null when no tool ran).
pub const TOOL_RESULT: &str = "tool_result";

pub fn agent_schema() -> StateSchema {
    StateSchema::new(
        fields([CONVERSATION, TOOL_CATALOG]),
        fields([ANSWER, TOOL_CHOICE, TOOL_RESULT]),
    )
}

/// The agent flow as an uncompiled builder, for callers that add options first.
pub fn agent_state_graph() -> Result<StateGraph<AgentContext>, CompilationError> {
    let mut graph = StateGraph::<AgentContext>::new().with_schema(agent_schema());
    graph
        .add_node(
            PREPARING_INPUT,
            Arc::new(PreparingInputNode),
            fields([CONVERSATION, TOOL_CATALOG]),
            fields([SELECTION_REQUEST]),
        )?
        .add_node(
            CHOOSING_TOOL,
            Arc::new(ChoosingToolNode),
            fields([CONVERSATION, SELECTION_REQUEST]),
            fields([TOOL_CHOICE, ANSWER, TOOL_RESULT]),
        )?
        .add_node(
            CALLING_TOOL,
            Arc::new(CallingToolNode),
            fields([TOOL_CHOICE]),
            fields([TOOL_RESULT]),
        )?
        .add_node(
            SYNTHESIZING_RESPONSE,
            Arc::new(SynthesizingResponseNode),
            fields([TOOL_RESULT, CONVERSATION]),
            fields([ANSWER]),
        )?;
    graph
        .add_edge(START, PREPARING_INPUT)?
        .add_edge(PREPARING_INPUT, CHOOSING_TOOL)?
        .add_conditional_edge(CHOOSING_TOOL, route_tool_choice, [CALLING_TOOL, END])?
        .add_edge(CALLING_TOOL, SYNTHESIZING_RESPONSE)?
        .add_edge(SYNTHESIZING_RESPONSE, END)?;
    Ok(graph)
}

/// Compiles the agent flow.
pub fn compile_agent_graph() -> Result<CompiledGraph<AgentContext>, CompilationError> {
    agent_state_graph()?.compile()
}
