//! Node lifecycle events delivered to observers.

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use toolgraph::{
    fields, ChannelObserver, FieldSet, NodeEvent, NodeEventKind, NodeOptions, RunContext,
    StateGraph, END, START,
};

use super::common::{set_field, state, CountingNode, FailingNode};

/// **Scenario**: Every dispatch emits Started then Succeeded/Failed with a 1-based step.
#[tokio::test]
async fn channel_observer_sees_every_dispatch() {
    let mut graph = StateGraph::<()>::new();
    graph
        .add_node_with_options(
            "flaky",
            Arc::new(FailingNode("ignored")),
            FieldSet::new(),
            FieldSet::new(),
            NodeOptions::new().best_effort(),
        )
        .unwrap();
    graph
        .add_node("done", set_field("done", json!(true)), FieldSet::new(), fields(["done"]))
        .unwrap();
    graph.add_edge(START, "flaky").unwrap();
    graph.add_edge("flaky", "done").unwrap();
    graph.add_edge("done", END).unwrap();

    let (observer, mut rx) = ChannelObserver::channel();
    let ctx = RunContext::new(()).with_observer(Arc::new(observer));
    graph.compile().unwrap().run(state(&[]), &ctx).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let summary: Vec<(&str, usize, bool)> = events
        .iter()
        .map(|e| (e.node_id.as_str(), e.step, e.is_failure()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("flaky", 1, false),
            ("flaky", 1, true),
            ("done", 2, false),
            ("done", 2, false),
        ]
    );
    assert_eq!(events[0].kind, NodeEventKind::Started);
    assert!(matches!(
        &events[1].kind,
        NodeEventKind::Failed { error } if error.contains("ignored")
    ));
    assert_eq!(events[3].kind, NodeEventKind::Succeeded);
    assert!(events.iter().all(|e| e.run_id == ctx.run_id()));
}

/// **Scenario**: Cancelling from an observer stops the run before the next node.
#[tokio::test]
async fn cancel_from_observer_stops_at_next_node() {
    let second = CountingNode::new();
    let mut graph = StateGraph::<()>::new();
    graph
        .add_node("first", set_field("a", json!(1)), FieldSet::new(), fields(["a"]))
        .unwrap();
    graph.add_node("second", second.clone(), FieldSet::new(), fields(["count"])).unwrap();
    graph.add_edge(START, "first").unwrap();
    graph.add_edge("first", "second").unwrap();
    graph.add_edge("second", END).unwrap();

    let token = CancellationToken::new();
    let trigger = token.clone();
    let observer = move |event: &NodeEvent| {
        if event.node_id == "first" && event.kind == NodeEventKind::Succeeded {
            trigger.cancel();
        }
    };
    let ctx = RunContext::new(())
        .with_cancellation(token)
        .with_observer(Arc::new(observer));
    let err = graph.compile().unwrap().run(state(&[]), &ctx).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.node_id(), Some("second"));
    assert_eq!(err.trace().node_ids(), vec!["first"]);
    assert_eq!(second.calls(), 0);
}
