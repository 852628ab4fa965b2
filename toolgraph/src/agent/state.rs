//! Typed values the agent flow stores in its state fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// A request to invoke one tool with JSON arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of tool selection. Routing after `ChoosingTool` matches on this exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    /// Selection answered directly; the answer is already in state.
    NoTool,
    ToolCall(ToolCall),
}

impl ToolChoice {
    pub fn tool_call(&self) -> Option<&ToolCall> {
        match self {
            ToolChoice::NoTool => None,
            ToolChoice::ToolCall(call) => Some(call),
        }
    }
}

/// Conversation context handed to the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
    /// When set, selection is skipped and this call is used.
    #[serde(default)]
    pub forced_tool: Option<ToolCall>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            forced_tool: None,
        }
    }

    /// Single-turn conversation holding one user message.
    pub fn from_query(query: impl Into<String>) -> Self {
        Self::new(vec![Message::user(query)])
    }

    pub fn with_forced_tool(mut self, call: ToolCall) -> Self {
        self.forced_tool = Some(call);
        self
    }

    pub fn latest_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_user())
            .map(Message::content)
    }
}

fn enabled_by_default() -> bool {
    true
}

/// One entry of the tool catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for arguments.
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: Value::Object(Default::default()),
            enabled: true,
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// What `PreparingInput` hands to selection: the query, history and usable tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub query: String,
    pub history: Vec<Message>,
    pub tools: Vec<ToolDescriptor>,
}

impl SelectionRequest {
    pub fn offers(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t.name == tool_name)
    }
}

/// Final answer text; `streamed` is true when it was assembled from chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub streamed: bool,
}

/// Output of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub content: String,
}
