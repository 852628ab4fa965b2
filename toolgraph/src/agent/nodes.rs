//! The four nodes of the agent flow and the router after `ChoosingTool`.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::BoxError;
use crate::graph::{Node, RunContext, END};
use crate::state::{StateContainer, StateDelta, StateError};

use super::capability::{AgentContext, AnswerSource, CapabilityError, Selection, ToolContext};
use super::graph::{
    ANSWER, CALLING_TOOL, CONVERSATION, SELECTION_REQUEST, TOOL_CATALOG, TOOL_CHOICE, TOOL_RESULT,
};
use super::state::{
    Answer, Conversation, SelectionRequest, ToolChoice, ToolDescriptor, ToolResult,
};

/// Drains an answer source, forwarding each chunk to `tx` when set.
///
/// A complete text is forwarded as a single chunk.
pub async fn collect_answer(
    source: AnswerSource,
    tx: Option<&mpsc::UnboundedSender<String>>,
) -> Result<Answer, CapabilityError> {
    match source {
        AnswerSource::Text(text) => {
            if let Some(tx) = tx {
                if !text.is_empty() {
                    let _ = tx.send(text.clone());
                }
            }
            Ok(Answer {
                text,
                streamed: false,
            })
        }
        AnswerSource::Stream(mut chunks) => {
            let mut text = String::new();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(CapabilityError::Stream)?;
                if let Some(tx) = tx {
                    let _ = tx.send(chunk.clone());
                }
                text.push_str(&chunk);
            }
            Ok(Answer {
                text,
                streamed: true,
            })
        }
    }
}

/// Routes on the selection outcome: `NoTool` ends the run, `ToolCall` goes to `CallingTool`.
pub fn route_tool_choice(state: &StateContainer) -> Result<String, StateError> {
    let choice: ToolChoice = state.get(TOOL_CHOICE)?;
    Ok(match choice {
        ToolChoice::NoTool => END.to_string(),
        ToolChoice::ToolCall(_) => CALLING_TOOL.to_string(),
    })
}

/// Builds the selection request: latest user message, history, enabled tools.
pub struct PreparingInputNode;

#[async_trait]
impl Node<AgentContext> for PreparingInputNode {
    async fn run(
        &self,
        state: &StateContainer,
        _ctx: &RunContext<AgentContext>,
    ) -> Result<StateDelta, BoxError> {
        let conversation: Conversation = state.get(CONVERSATION)?;
        let catalog: Vec<ToolDescriptor> = state.get(TOOL_CATALOG)?;

        let query = conversation
            .latest_user_message()
            .ok_or(CapabilityError::EmptyConversation)?
            .to_string();
        let tools: Vec<ToolDescriptor> = catalog.into_iter().filter(|t| t.enabled).collect();
        let request = SelectionRequest {
            query,
            history: conversation.messages.clone(),
            tools,
        };
        if let Some(forced) = &conversation.forced_tool {
            if !request.offers(&forced.name) {
                return Err(CapabilityError::ForcedToolUnavailable(forced.name.clone()).into());
            }
        }
        tracing::debug!(tools = request.tools.len(), "Prepared selection request");
        Ok(StateDelta::new().set(SELECTION_REQUEST, &request)?)
    }
}

/// Picks a tool or answers directly.
///
/// On a direct answer the answer is drained here (streamed to the answer channel) and
/// `tool_result` is set to null, since no tool runs on that branch.
pub struct ChoosingToolNode;

#[async_trait]
impl Node<AgentContext> for ChoosingToolNode {
    async fn run(
        &self,
        state: &StateContainer,
        ctx: &RunContext<AgentContext>,
    ) -> Result<StateDelta, BoxError> {
        let conversation: Conversation = state.get(CONVERSATION)?;
        let request: SelectionRequest = state.get(SELECTION_REQUEST)?;

        if let Some(forced) = conversation.forced_tool {
            tracing::debug!(tool = %forced.name, "Using forced tool");
            return Ok(StateDelta::new().set(TOOL_CHOICE, ToolChoice::ToolCall(forced))?);
        }

        let agent = ctx.context();
        match agent.selector.select(&request).await? {
            Selection::Answer(source) => {
                let answer = collect_answer(source, agent.answer_tx.as_ref()).await?;
                Ok(StateDelta::new()
                    .set(TOOL_CHOICE, ToolChoice::NoTool)?
                    .set(ANSWER, &answer)?
                    .set(TOOL_RESULT, Option::<ToolResult>::None)?)
            }
            Selection::ToolCall(call) => {
                if !request.offers(&call.name) {
                    return Err(CapabilityError::UnknownToolSelected(call.name).into());
                }
                tracing::debug!(tool = %call.name, "Tool selected");
                Ok(StateDelta::new().set(TOOL_CHOICE, ToolChoice::ToolCall(call))?)
            }
        }
    }
}

/// Resolves and invokes the chosen tool. Tool errors are returned unchanged so callers
/// can downcast the `NodeExecution` cause to `ToolExecutionError`.
pub struct CallingToolNode;

#[async_trait]
impl Node<AgentContext> for CallingToolNode {
    async fn run(
        &self,
        state: &StateContainer,
        ctx: &RunContext<AgentContext>,
    ) -> Result<StateDelta, BoxError> {
        let choice: ToolChoice = state.get(TOOL_CHOICE)?;
        let call = choice.tool_call().ok_or(CapabilityError::NoToolCall)?;

        let tool = ctx.context().tools.resolve(&call.name)?;
        let tool_ctx = ToolContext {
            run_id: ctx.run_id(),
            cancellation: ctx.cancellation_token().clone(),
        };
        let result = tool.invoke(&call.arguments, &tool_ctx).await?;
        tracing::debug!(tool = %result.name, bytes = result.content.len(), "Tool returned");
        Ok(StateDelta::new().set(TOOL_RESULT, &result)?)
    }
}

/// Produces the final answer from the tool result.
pub struct SynthesizingResponseNode;

#[async_trait]
impl Node<AgentContext> for SynthesizingResponseNode {
    async fn run(
        &self,
        state: &StateContainer,
        ctx: &RunContext<AgentContext>,
    ) -> Result<StateDelta, BoxError> {
        let result: ToolResult = state.get(TOOL_RESULT)?;
        let conversation: Conversation = state.get(CONVERSATION)?;

        let agent = ctx.context();
        let source = agent.synthesizer.synthesize(&result, &conversation).await?;
        let answer = collect_answer(source, agent.answer_tx.as_ref()).await?;
        Ok(StateDelta::new().set(ANSWER, &answer)?)
    }
}
