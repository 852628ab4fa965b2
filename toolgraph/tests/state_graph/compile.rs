//! Compile-time validation through the public builder API.

use serde_json::json;
use toolgraph::{
    fields, CompilationError, FieldSet, StateContainer, StateGraph, StateSchema, END, START,
};

use super::common::{noop, set_field};

fn compile_err(graph: StateGraph<()>) -> CompilationError {
    match graph.compile() {
        Err(e) => e,
        Ok(g) => panic!("expected compile error, got {:?}", g),
    }
}

/// **Scenario**: A conditional edge whose targets omit a node leaves it unreachable.
#[test]
fn omitted_branch_target_is_rejected() {
    let mut graph = StateGraph::<()>::new();
    graph
        .add_node("choose", noop(), FieldSet::new(), FieldSet::new())
        .unwrap()
        .add_node("call", noop(), FieldSet::new(), FieldSet::new())
        .unwrap();
    graph.add_edge(START, "choose").unwrap();
    graph
        .add_conditional_edge("choose", |_s: &StateContainer| Ok(END.to_string()), [END])
        .unwrap();
    graph.add_edge("call", END).unwrap();
    assert_eq!(compile_err(graph), CompilationError::UnreachableNode("call".into()));
}

/// **Scenario**: Checks run in order; a missing outgoing edge is reported before reachability.
#[test]
fn missing_edge_reported_before_unreachable() {
    let mut graph = StateGraph::<()>::new();
    graph.add_node("a", noop(), FieldSet::new(), FieldSet::new()).unwrap();
    graph.add_node("island", noop(), FieldSet::new(), FieldSet::new()).unwrap();
    graph.add_edge(START, "a").unwrap();
    graph.add_edge("a", END).unwrap();
    assert_eq!(
        compile_err(graph),
        CompilationError::MissingOutgoingEdge("island".into())
    );
}

/// **Scenario**: Inputs provided by the graph Input schema or by an upstream node are satisfied.
#[test]
fn schema_inputs_satisfied_by_input_or_upstream() {
    let mut graph = StateGraph::<()>::new()
        .with_schema(StateSchema::new(fields(["question"]), fields(["reply"])));
    graph
        .add_node("draft", set_field("draft", json!("d")), fields(["question"]), fields(["draft"]))
        .unwrap()
        .add_node("polish", set_field("reply", json!("r")), fields(["draft"]), fields(["reply"]))
        .unwrap();
    graph
        .add_edge(START, "draft")
        .unwrap()
        .add_edge("draft", "polish")
        .unwrap()
        .add_edge("polish", END)
        .unwrap();
    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.node_ids().collect::<Vec<_>>(), vec!["draft", "polish"]);
    let (inputs, outputs) = compiled.node_fields("polish").unwrap();
    assert!(inputs.contains("draft"));
    assert!(outputs.contains("reply"));
}

/// **Scenario**: A field produced only on a sibling branch does not satisfy a node's input.
#[test]
fn sibling_branch_output_does_not_satisfy_input() {
    let mut graph = StateGraph::<()>::new();
    graph.add_node("split", noop(), FieldSet::new(), FieldSet::new()).unwrap();
    graph.add_node("left", set_field("l", json!(1)), FieldSet::new(), fields(["l"])).unwrap();
    graph.add_node("right", noop(), fields(["l"]), FieldSet::new()).unwrap();
    graph.add_edge(START, "split").unwrap();
    graph
        .add_conditional_edge(
            "split",
            |_s: &StateContainer| Ok("left".to_string()),
            ["left", "right"],
        )
        .unwrap();
    graph.add_edge("left", END).unwrap();
    graph.add_edge("right", END).unwrap();
    assert_eq!(
        compile_err(graph),
        CompilationError::UnsatisfiedInput {
            node: "right".into(),
            field: "l".into(),
        }
    );
}

/// **Scenario**: A compiled graph is cheap to clone and the clones share the definition.
#[test]
fn compiled_graph_clones_share_structure() {
    let mut graph = StateGraph::<()>::new();
    graph.add_node("only", noop(), FieldSet::new(), FieldSet::new()).unwrap();
    graph.add_edge(START, "only").unwrap().add_edge("only", END).unwrap();
    let compiled = graph.compile().unwrap();
    let clone = compiled.clone();
    assert_eq!(clone.start(), compiled.start());
    assert!(clone.edge("only").is_some());
}
