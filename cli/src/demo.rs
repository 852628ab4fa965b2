//! Demo capabilities: a keyword selector, two local tools and a template synthesizer.

use std::sync::Arc;

use serde_json::{json, Value};
use toolgraph::agent::{
    AgentContext, FnTool, KeywordSelector, StaticToolProvider, TemplateSynthesizer,
    ToolDescriptor, ToolExecutionError,
};

pub const SEARCH_DOCS: &str = "search_docs";
pub const GET_TIME: &str = "get_time";

const DOCS: &[(&str, &str)] = &[
    ("compile", "compile() validates start node, edges, reachability and schemas."),
    ("edge", "Conditional edges declare every target a predicate may return."),
    ("cancel", "Cancellation is checked before each node; the run stops with Cancelled."),
    ("timeout", "Node timeouts are fatal; the run deadline caps every node deadline."),
    ("state", "Nodes return deltas; fields are added or overwritten, never removed."),
];

/// Tools offered to the selector.
pub fn catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(SEARCH_DOCS, "Search the toolgraph documentation").with_input_schema(
            json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        ),
        ToolDescriptor::new(GET_TIME, "Current UTC time (RFC 3339)"),
    ]
}

fn search_docs(args: &Value) -> Result<String, ToolExecutionError> {
    let query = args
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolExecutionError::InvalidArguments {
            tool: SEARCH_DOCS.to_string(),
            reason: "missing string field `query`".to_string(),
        })?
        .to_lowercase();
    let hits: Vec<&str> = DOCS
        .iter()
        .filter(|(topic, _)| query.contains(topic))
        .map(|(_, text)| *text)
        .collect();
    if hits.is_empty() {
        Ok("no matching documentation".to_string())
    } else {
        Ok(hits.join(" "))
    }
}

fn get_time(_args: &Value) -> Result<String, ToolExecutionError> {
    Ok(chrono::Utc::now().to_rfc3339())
}

/// Capabilities for the demo flow. `stream` makes answers arrive word by word.
pub fn context(stream: bool) -> AgentContext {
    let mut selector = KeywordSelector::new(
        "I can search the docs or tell the time. Try asking about edges or the time.",
    )
    .with_rule("doc", SEARCH_DOCS)
    .with_rule("how", SEARCH_DOCS)
    .with_rule("time", GET_TIME);
    let mut synthesizer = TemplateSynthesizer::new("{tool} says: {result}");
    if stream {
        selector = selector.streaming();
        synthesizer = synthesizer.streaming();
    }
    let tools = StaticToolProvider::new()
        .with_tool(Arc::new(FnTool::new(SEARCH_DOCS, search_docs)))
        .with_tool(Arc::new(FnTool::new(GET_TIME, get_time)));
    AgentContext::new(Arc::new(selector), Arc::new(tools), Arc::new(synthesizer))
}
