//! Simple capabilities for tests, demos and the CLI.
//!
//! - [`KeywordSelector`]: calls a tool when the query mentions one of its keywords.
//! - [`ScriptedSelector`]: returns a fixed selection and counts calls.
//! - [`StaticToolProvider`] + [`FnTool`]: tools backed by closures.
//! - [`TemplateSynthesizer`]: formats the tool result into the answer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use serde_json::{json, Value};

use crate::error::BoxError;

use super::capability::{
    AnswerSource, Selection, Synthesizer, Tool, ToolContext, ToolExecutionError, ToolProvider,
    ToolSelector,
};
use super::state::{Conversation, SelectionRequest, ToolCall, ToolResult};

fn word_chunks(text: &str) -> AnswerSource {
    let chunks: Vec<Result<String, BoxError>> = text
        .split_inclusive(' ')
        .map(|w| Ok(w.to_string()))
        .collect();
    AnswerSource::stream(stream::iter(chunks))
}

/// Selects a tool when the lowercased query contains one of its keywords; otherwise
/// answers with a fixed fallback text.
///
/// The tool is called with `{"query": <query>}`. Only tools offered in the request
/// are considered.
pub struct KeywordSelector {
    rules: Vec<(String, String)>,
    fallback: String,
    stream_answer: bool,
}

impl KeywordSelector {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
            stream_answer: false,
        }
    }

    pub fn with_rule(mut self, keyword: impl Into<String>, tool: impl Into<String>) -> Self {
        self.rules.push((keyword.into().to_lowercase(), tool.into()));
        self
    }

    /// Streams the fallback answer word by word.
    pub fn streaming(mut self) -> Self {
        self.stream_answer = true;
        self
    }
}

#[async_trait]
impl ToolSelector for KeywordSelector {
    async fn select(&self, request: &SelectionRequest) -> Result<Selection, BoxError> {
        let query = request.query.to_lowercase();
        let hit = self
            .rules
            .iter()
            .find(|(keyword, tool)| query.contains(keyword.as_str()) && request.offers(tool));
        if let Some((_, tool)) = hit {
            return Ok(Selection::ToolCall(ToolCall::new(
                tool.clone(),
                json!({ "query": request.query }),
            )));
        }
        let answer = if self.stream_answer {
            word_chunks(&self.fallback)
        } else {
            AnswerSource::text(self.fallback.clone())
        };
        Ok(Selection::Answer(answer))
    }
}

enum Script {
    Answer(String),
    Streamed(Vec<String>),
    ToolCall(ToolCall),
    Fail(String),
}

/// Returns the same scripted selection on every call.
pub struct ScriptedSelector {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedSelector {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self::with_script(Script::Answer(text.into()))
    }

    pub fn streamed<I, T>(chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::with_script(Script::Streamed(chunks.into_iter().map(Into::into).collect()))
    }

    pub fn tool_call(call: ToolCall) -> Self {
        Self::with_script(Script::ToolCall(call))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolSelector for ScriptedSelector {
    async fn select(&self, _request: &SelectionRequest) -> Result<Selection, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Answer(text) => Ok(Selection::Answer(AnswerSource::text(text.clone()))),
            Script::Streamed(chunks) => {
                let items: Vec<Result<String, BoxError>> =
                    chunks.iter().cloned().map(Ok).collect();
                Ok(Selection::Answer(AnswerSource::stream(stream::iter(items))))
            }
            Script::ToolCall(call) => Ok(Selection::ToolCall(call.clone())),
            Script::Fail(message) => Err(message.clone().into()),
        }
    }
}

type ToolFn = dyn Fn(&Value) -> Result<String, ToolExecutionError> + Send + Sync;

/// Tool backed by a closure from arguments to result text.
pub struct FnTool {
    name: String,
    f: Box<ToolFn>,
    calls: AtomicUsize,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<String, ToolExecutionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        arguments: &Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = (self.f)(arguments)?;
        Ok(ToolResult {
            name: self.name.clone(),
            content,
        })
    }
}

/// Fixed set of tools keyed by name.
#[derive(Default)]
pub struct StaticToolProvider {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl StaticToolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }
}

impl ToolProvider for StaticToolProvider {
    fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolExecutionError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolExecutionError::NotFound(name.to_string()))
    }
}

/// Formats the answer from a template with `{tool}`, `{result}` and `{query}` placeholders.
pub struct TemplateSynthesizer {
    template: String,
    stream_answer: bool,
}

impl Default for TemplateSynthesizer {
    fn default() -> Self {
        Self::new("Based on {tool}: {result}")
    }
}

impl TemplateSynthesizer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            stream_answer: false,
        }
    }

    /// Streams the answer word by word.
    pub fn streaming(mut self) -> Self {
        self.stream_answer = true;
        self
    }
}

#[async_trait]
impl Synthesizer for TemplateSynthesizer {
    async fn synthesize(
        &self,
        result: &ToolResult,
        conversation: &Conversation,
    ) -> Result<AnswerSource, BoxError> {
        let text = self
            .template
            .replace("{tool}", &result.name)
            .replace("{result}", &result.content)
            .replace("{query}", conversation.latest_user_message().unwrap_or_default());
        Ok(if self.stream_answer {
            word_chunks(&text)
        } else {
            AnswerSource::text(text)
        })
    }
}
