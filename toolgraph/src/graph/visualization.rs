//! Graph visualization: Graphviz DOT and a plain-text listing of a compiled graph.
//!
//! Conditional edges are drawn dashed, one arrow per declared target.

use std::fmt::Write;

use super::{CompiledGraph, Edge, END, START};

fn dot_id(id: &str) -> String {
    format!("\"{}\"", id.replace('"', "\\\""))
}

/// Generate Graphviz DOT format representation of the graph.
pub fn generate_dot<C>(graph: &CompiledGraph<C>) -> String {
    let mut dot = String::from("digraph {\n");
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  node [shape=box];\n\n");
    let _ = writeln!(
        dot,
        "  {} [label=\"START\", style=bold, fillcolor=lightgreen];",
        dot_id(START)
    );
    let _ = writeln!(
        dot,
        "  {} [label=\"END\", style=bold, fillcolor=lightcoral];",
        dot_id(END)
    );
    for node_id in graph.node_ids() {
        let _ = writeln!(dot, "  {};", dot_id(node_id));
    }
    dot.push('\n');

    let _ = writeln!(dot, "  {} -> {};", dot_id(START), dot_id(graph.start()));
    for node_id in graph.node_ids() {
        match graph.edge(node_id) {
            Some(Edge::Unconditional(target)) => {
                let _ = writeln!(dot, "  {} -> {};", dot_id(node_id), dot_id(target));
            }
            Some(Edge::Conditional(router)) => {
                for target in router.targets() {
                    let _ = writeln!(
                        dot,
                        "  {} -> {} [style=dashed];",
                        dot_id(node_id),
                        dot_id(target)
                    );
                }
            }
            None => {}
        }
    }
    dot.push_str("}\n");
    dot
}

/// Generate a simple text representation of the graph structure.
pub fn generate_text<C>(graph: &CompiledGraph<C>) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Graph Structure:");
    let _ = writeln!(text, "Nodes: {}", graph.node_ids().count());
    let _ = writeln!(text, "\nEdges:");
    let _ = writeln!(text, "  {} -> {}", START, graph.start());
    for node_id in graph.node_ids() {
        match graph.edge(node_id) {
            Some(Edge::Unconditional(target)) => {
                let _ = writeln!(text, "  {} -> {}", node_id, target);
            }
            Some(Edge::Conditional(router)) => {
                let targets: Vec<&str> = router.targets().iter().map(String::as_str).collect();
                let _ = writeln!(
                    text,
                    "  {} -> {{{}}} (conditional)",
                    node_id,
                    targets.join(" | ")
                );
            }
            None => {}
        }
    }
    text
}
