//! Reference agent flow: decide between answering directly and calling one tool.
//!
//! Nodes `PreparingInput → ChoosingTool → {CallingTool | END}`, then
//! `CallingTool → SynthesizingResponse → END`. The branch after `ChoosingTool` is an
//! exhaustive match over [`ToolChoice`]. Capabilities (selection, tools, synthesis) are
//! injected through [`AgentContext`]; [`AgentRunner`] wraps the compiled graph with typed
//! input and output.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolgraph::agent::{
//!     AgentContext, AgentInput, AgentRunner, Conversation, KeywordSelector,
//!     StaticToolProvider, TemplateSynthesizer,
//! };
//! use toolgraph::graph::RunContext;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = RunContext::new(AgentContext::new(
//!     Arc::new(KeywordSelector::new("I can answer that directly.")),
//!     Arc::new(StaticToolProvider::new()),
//!     Arc::new(TemplateSynthesizer::default()),
//! ));
//! let runner = AgentRunner::new()?;
//! let input = AgentInput::new(Conversation::from_query("hello"), Vec::new());
//! let output = runner.run(input, &ctx).await?;
//! println!("{} ({})", output.answer.text, output.trace);
//! # Ok(())
//! # }
//! ```

mod capability;
mod graph;
pub mod mock;
mod nodes;
mod runner;
mod state;

pub use capability::{
    AgentContext, AnswerSource, CapabilityError, Selection, Synthesizer, Tool, ToolContext,
    ToolExecutionError, ToolProvider, ToolSelector,
};
pub use graph::{
    agent_schema, agent_state_graph, compile_agent_graph, ANSWER, CALLING_TOOL, CHOOSING_TOOL,
    CONVERSATION, PREPARING_INPUT, SELECTION_REQUEST, SYNTHESIZING_RESPONSE, TOOL_CATALOG,
    TOOL_CHOICE, TOOL_RESULT,
};
pub use mock::{FnTool, KeywordSelector, ScriptedSelector, StaticToolProvider, TemplateSynthesizer};
pub use nodes::{
    collect_answer, route_tool_choice, CallingToolNode, ChoosingToolNode, PreparingInputNode,
    SynthesizingResponseNode,
};
pub use runner::{AgentInput, AgentOutput, AgentRunError, AgentRunner};
pub use state::{
    Answer, Conversation, SelectionRequest, ToolCall, ToolChoice, ToolDescriptor, ToolResult,
};
