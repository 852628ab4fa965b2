//! Run loop: merge, routing, limits, deadlines, failures and cancellation.

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use toolgraph::{
    fields, EngineConfig, FieldSet, NodeEvent, NodeEventKind, NodeOptions, RunContext,
    RunErrorKind, StateContainer, StateGraph, StateSchema, END, START,
};

use super::common::{noop, set_field, state, CountingNode, Exploded, FailingNode, SleepyNode};

/// START -> count -> (count < target ? count : END)
fn counting_loop(target: i64) -> (StateGraph<()>, Arc<CountingNode>) {
    let counter = CountingNode::new();
    let mut graph = StateGraph::<()>::new()
        .with_schema(StateSchema::new(FieldSet::new(), fields(["count"])));
    graph
        .add_node("count", counter.clone(), fields(["count"]), fields(["count"]))
        .unwrap();
    graph.add_edge(START, "count").unwrap();
    graph
        .add_conditional_edge(
            "count",
            move |s: &StateContainer| {
                let count: i64 = s.get("count")?;
                Ok(if count < target { "count".to_string() } else { END.to_string() })
            },
            ["count", END],
        )
        .unwrap();
    (graph, counter)
}

/// **Scenario**: A linear graph merges every delta; only Output fields are returned.
#[tokio::test]
async fn linear_run_returns_output_view_and_trace() {
    let mut graph = StateGraph::<()>::new()
        .with_schema(StateSchema::new(fields(["in"]), fields(["out"])));
    graph
        .add_node("a", set_field("scratch", json!("tmp")), fields(["in"]), fields(["scratch"]))
        .unwrap()
        .add_node("b", set_field("out", json!(42)), fields(["scratch"]), fields(["out"]))
        .unwrap();
    graph
        .add_edge(START, "a")
        .unwrap()
        .add_edge("a", "b")
        .unwrap()
        .add_edge("b", END)
        .unwrap();
    let compiled = graph.compile().unwrap();

    let outcome = compiled
        .run(state(&[("in", json!(1))]), &RunContext::new(()))
        .await
        .unwrap();
    assert_eq!(outcome.trace.node_ids(), vec!["a", "b"]);
    assert_eq!(outcome.output.get::<i64>("out").unwrap(), 42);
    assert!(!outcome.output.contains("scratch"));
    assert!(!outcome.output.contains("in"));
}

/// **Scenario**: A conditional loop runs until its predicate routes to END.
#[tokio::test]
async fn conditional_loop_terminates() {
    let (graph, counter) = counting_loop(3);
    let outcome = graph.compile().unwrap().run(state(&[]), &RunContext::new(())).await.unwrap();
    assert_eq!(outcome.trace.node_ids(), vec!["count", "count", "count"]);
    assert_eq!(outcome.output.get::<i64>("count").unwrap(), 3);
    assert_eq!(counter.calls(), 3);
}

/// **Scenario**: A loop longer than the step limit stops with StepLimitExceeded.
#[tokio::test]
async fn step_limit_exceeded() {
    let (graph, counter) = counting_loop(i64::MAX);
    let compiled = graph
        .compile()
        .unwrap()
        .with_config(EngineConfig::default().with_max_steps(5));
    let err = compiled.run(state(&[]), &RunContext::new(())).await.unwrap_err();
    match err.kind() {
        RunErrorKind::StepLimitExceeded { limit, node_id } => {
            assert_eq!(*limit, 5);
            assert_eq!(node_id, "count");
        }
        other => panic!("expected StepLimitExceeded, got {:?}", other),
    }
    assert_eq!(err.trace().len(), 5);
    assert_eq!(counter.calls(), 5);
}

/// **Scenario**: Identical inputs and deterministic nodes produce identical traces.
#[tokio::test]
async fn runs_are_deterministic() {
    let (graph, _) = counting_loop(4);
    let compiled = graph.compile().unwrap();
    let first = compiled.run(state(&[]), &RunContext::new(())).await.unwrap();
    let second = compiled.run(state(&[]), &RunContext::new(())).await.unwrap();
    assert_eq!(first, second);
}

/// **Scenario**: Concurrent runs over one compiled graph do not share state.
#[tokio::test]
async fn concurrent_runs_share_compiled_graph() {
    let (graph, counter) = counting_loop(10);
    let compiled = graph.compile().unwrap();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let compiled = compiled.clone();
            tokio::spawn(async move {
                compiled
                    .run(state(&[("count", json!(i))]), &RunContext::new(()))
                    .await
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.output.get::<i64>("count").unwrap(), 10);
        assert_eq!(outcome.trace.len(), 10 - i);
    }
    assert_eq!(counter.calls(), (3..=10).sum::<usize>());
}

/// **Scenario**: A missing Input field fails before any node runs.
#[tokio::test]
async fn missing_input_fails_before_dispatch() {
    let counter = CountingNode::new();
    let mut graph = StateGraph::<()>::new()
        .with_schema(StateSchema::new(fields(["required"]), FieldSet::new()));
    graph.add_node("n", counter.clone(), FieldSet::new(), fields(["count"])).unwrap();
    graph.add_edge(START, "n").unwrap().add_edge("n", END).unwrap();
    let err = graph
        .compile()
        .unwrap()
        .run(state(&[]), &RunContext::new(()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), RunErrorKind::MissingInput { field } if field == "required"));
    assert!(err.trace().is_empty());
    assert_eq!(counter.calls(), 0);
}

/// **Scenario**: Reaching END without every Output field is IncompleteOutput.
#[tokio::test]
async fn incomplete_output_at_terminal() {
    let mut graph = StateGraph::<()>::new()
        .with_schema(StateSchema::new(FieldSet::new(), fields(["result"])));
    graph.add_node("maybe", noop(), FieldSet::new(), fields(["result"])).unwrap();
    graph.add_edge(START, "maybe").unwrap().add_edge("maybe", END).unwrap();
    let err = graph
        .compile()
        .unwrap()
        .run(state(&[]), &RunContext::new(()))
        .await
        .unwrap_err();
    match err.kind() {
        RunErrorKind::IncompleteOutput { node_id, missing } => {
            assert_eq!(node_id, "maybe");
            assert_eq!(missing, &vec!["result".to_string()]);
        }
        other => panic!("expected IncompleteOutput, got {:?}", other),
    }
    assert_eq!(err.node_id(), Some("maybe"));
    assert_eq!(err.trace().node_ids(), vec!["maybe"]);
}

/// **Scenario**: A predicate returning an undeclared target is a fatal Routing error.
#[tokio::test]
async fn undeclared_route_is_fatal() {
    let mut graph = StateGraph::<()>::new();
    graph.add_node("a", noop(), FieldSet::new(), FieldSet::new()).unwrap();
    graph.add_node("b", noop(), FieldSet::new(), FieldSet::new()).unwrap();
    graph.add_edge(START, "a").unwrap();
    graph
        .add_conditional_edge("a", |_s: &StateContainer| Ok("nowhere".to_string()), ["b", END])
        .unwrap();
    graph.add_edge("b", END).unwrap();
    let err = graph
        .compile()
        .unwrap()
        .run(state(&[]), &RunContext::new(()))
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        RunErrorKind::Routing { node_id, target } if node_id == "a" && target == "nowhere"
    ));
    assert_eq!(err.node_id(), Some("a"));
    assert_eq!(err.trace().node_ids(), vec!["a"]);
}

/// **Scenario**: A predicate that cannot read its field is RoutingPredicate with the cause.
#[tokio::test]
async fn predicate_failure_is_routing_predicate() {
    let mut graph = StateGraph::<()>::new();
    graph.add_node("a", noop(), FieldSet::new(), FieldSet::new()).unwrap();
    graph.add_edge(START, "a").unwrap();
    graph
        .add_conditional_edge("a", |s: &StateContainer| s.get::<String>("route"), [END])
        .unwrap();
    let err = graph
        .compile()
        .unwrap()
        .run(state(&[]), &RunContext::new(()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), RunErrorKind::RoutingPredicate { .. }));
    assert!(err.source().is_some());
}

/// **Scenario**: A node error is fatal and its cause is preserved for downcasting.
#[tokio::test]
async fn node_error_preserves_cause() {
    let mut graph = StateGraph::<()>::new();
    graph.add_node("ok", noop(), FieldSet::new(), FieldSet::new()).unwrap();
    graph
        .add_node("boom", Arc::new(FailingNode("disk full")), FieldSet::new(), FieldSet::new())
        .unwrap();
    graph.add_edge(START, "ok").unwrap();
    graph.add_edge("ok", "boom").unwrap();
    graph.add_edge("boom", END).unwrap();
    let err = graph
        .compile()
        .unwrap()
        .run(state(&[]), &RunContext::new(()))
        .await
        .unwrap_err();
    assert_eq!(err.node_id(), Some("boom"));
    assert_eq!(err.trace().node_ids(), vec!["ok", "boom"]);
    let cause = err.source().expect("cause");
    let exploded = cause.downcast_ref::<Exploded>().expect("Exploded cause");
    assert_eq!(exploded.0, "disk full");
    assert!(err.to_string().contains("ok -> boom"), "{}", err);
}

/// **Scenario**: A best-effort node failure is skipped with an empty delta and the run continues.
#[tokio::test]
async fn best_effort_failure_continues() {
    let mut graph = StateGraph::<()>::new()
        .with_schema(StateSchema::new(FieldSet::new(), fields(["done"])));
    graph
        .add_node_with_options(
            "enrich",
            Arc::new(FailingNode("optional")),
            FieldSet::new(),
            fields(["extra"]),
            NodeOptions::new().best_effort(),
        )
        .unwrap();
    graph
        .add_node("finish", set_field("done", json!(true)), FieldSet::new(), fields(["done"]))
        .unwrap();
    graph.add_edge(START, "enrich").unwrap();
    graph.add_edge("enrich", "finish").unwrap();
    graph.add_edge("finish", END).unwrap();
    let outcome = graph
        .compile()
        .unwrap()
        .run(state(&[]), &RunContext::new(()))
        .await
        .unwrap();
    assert_eq!(outcome.trace.node_ids(), vec!["enrich", "finish"]);
    assert!(outcome.output.get::<bool>("done").unwrap());
}

/// **Scenario**: A node timeout is fatal even for a best-effort node.
#[tokio::test]
async fn node_timeout_is_fatal_even_when_best_effort() {
    let mut graph = StateGraph::<()>::new();
    graph
        .add_node_with_options(
            "slow",
            Arc::new(SleepyNode(Duration::from_millis(500))),
            FieldSet::new(),
            fields(["slept"]),
            NodeOptions::new()
                .best_effort()
                .with_timeout(Duration::from_millis(20)),
        )
        .unwrap();
    graph.add_edge(START, "slow").unwrap().add_edge("slow", END).unwrap();
    let err = graph
        .compile()
        .unwrap()
        .run(state(&[]), &RunContext::new(()))
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        RunErrorKind::NodeTimeout { node_id, timeout }
            if node_id == "slow" && *timeout == Duration::from_millis(20)
    ));
    assert_eq!(err.trace().node_ids(), vec!["slow"]);
}

/// **Scenario**: The engine default node timeout applies to nodes without their own.
#[tokio::test]
async fn engine_default_node_timeout() {
    let mut graph = StateGraph::<()>::new();
    graph
        .add_node(
            "slow",
            Arc::new(SleepyNode(Duration::from_millis(500))),
            FieldSet::new(),
            fields(["slept"]),
        )
        .unwrap();
    graph.add_edge(START, "slow").unwrap().add_edge("slow", END).unwrap();
    let compiled = graph
        .compile()
        .unwrap()
        .with_config(EngineConfig::default().with_node_timeout(Duration::from_millis(20)));
    let err = compiled.run(state(&[]), &RunContext::new(())).await.unwrap_err();
    assert!(matches!(err.kind(), RunErrorKind::NodeTimeout { .. }));
}

/// **Scenario**: The run deadline supersedes a longer node timeout.
#[tokio::test]
async fn run_deadline_supersedes_node_timeout() {
    let mut graph = StateGraph::<()>::new();
    graph
        .add_node("fast", set_field("a", json!(1)), FieldSet::new(), fields(["a"]))
        .unwrap();
    graph
        .add_node_with_options(
            "slow",
            Arc::new(SleepyNode(Duration::from_millis(500))),
            FieldSet::new(),
            fields(["slept"]),
            NodeOptions::new().with_timeout(Duration::from_secs(10)),
        )
        .unwrap();
    graph.add_edge(START, "fast").unwrap();
    graph.add_edge("fast", "slow").unwrap();
    graph.add_edge("slow", END).unwrap();
    let ctx = RunContext::new(()).with_timeout(Duration::from_millis(50));
    let err = graph.compile().unwrap().run(state(&[]), &ctx).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        RunErrorKind::RunTimeout { node_id, timeout }
            if node_id == "slow" && *timeout == Duration::from_millis(50)
    ));
    assert_eq!(err.trace().node_ids(), vec!["fast", "slow"]);
}

/// **Scenario**: A token cancelled before the run stops it before the start node.
#[tokio::test]
async fn cancelled_before_start() {
    let counter = CountingNode::new();
    let mut graph = StateGraph::<()>::new();
    graph.add_node("n", counter.clone(), FieldSet::new(), fields(["count"])).unwrap();
    graph.add_edge(START, "n").unwrap().add_edge("n", END).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RunContext::new(()).with_cancellation(token);
    let err = graph.compile().unwrap().run(state(&[]), &ctx).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.node_id(), Some("n"));
    assert!(err.trace().is_empty());
    assert_eq!(counter.calls(), 0);
}

/// **Scenario**: A node writing a field it did not declare fails the run.
#[tokio::test]
async fn undeclared_output_fails_run() {
    let mut graph = StateGraph::<()>::new();
    graph
        .add_node("sneaky", set_field("secret", json!(1)), FieldSet::new(), fields(["public"]))
        .unwrap();
    graph.add_edge(START, "sneaky").unwrap().add_edge("sneaky", END).unwrap();
    let err = graph
        .compile()
        .unwrap()
        .run(state(&[]), &RunContext::new(()))
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        RunErrorKind::NodeExecution { node_id, .. } if node_id == "sneaky"
    ));
    assert!(err.to_string().contains("secret"), "{}", err);
}

/// **Scenario**: A signalled token wins over an exhausted step limit at the same boundary.
#[tokio::test]
async fn cancellation_takes_precedence_over_step_limit() {
    let second = CountingNode::new();
    let mut graph = StateGraph::<()>::new();
    graph
        .add_node("a", set_field("a", json!(1)), FieldSet::new(), fields(["a"]))
        .unwrap();
    graph.add_node("b", second.clone(), FieldSet::new(), fields(["count"])).unwrap();
    graph.add_edge(START, "a").unwrap();
    graph.add_edge("a", "b").unwrap();
    graph.add_edge("b", END).unwrap();
    let compiled = graph
        .compile()
        .unwrap()
        .with_config(EngineConfig::default().with_max_steps(1));

    let token = CancellationToken::new();
    let trigger = token.clone();
    let observer = move |event: &NodeEvent| {
        if event.node_id == "a" && event.kind == NodeEventKind::Succeeded {
            trigger.cancel();
        }
    };
    let ctx = RunContext::new(())
        .with_cancellation(token)
        .with_observer(Arc::new(observer));
    let err = compiled.run(state(&[]), &ctx).await.unwrap_err();

    assert!(err.is_cancelled(), "{}", err);
    assert_eq!(err.node_id(), Some("b"));
    assert_eq!(err.trace().node_ids(), vec!["a"]);
    assert_eq!(second.calls(), 0);
}

/// **Scenario**: A signalled token wins over an already elapsed run deadline.
#[tokio::test]
async fn cancellation_takes_precedence_over_run_deadline() {
    let counter = CountingNode::new();
    let mut graph = StateGraph::<()>::new();
    graph.add_node("first", counter.clone(), FieldSet::new(), fields(["count"])).unwrap();
    graph.add_edge(START, "first").unwrap().add_edge("first", END).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let ctx = RunContext::new(())
        .with_cancellation(token)
        .with_timeout(Duration::ZERO);
    let err = graph.compile().unwrap().run(state(&[]), &ctx).await.unwrap_err();

    assert!(err.is_cancelled(), "{}", err);
    assert_eq!(err.node_id(), Some("first"));
    assert!(err.trace().is_empty());
    assert_eq!(counter.calls(), 0);
}
