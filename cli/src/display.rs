//! Human-readable output for stderr: node events and run errors.

use toolgraph::agent::AgentRunError;
use toolgraph::{NodeEvent, NodeEventKind};

/// Truncates to at most `max` chars, appending "..." when cut. UTF-8 safe.
pub(crate) fn truncate_display(s: &str, max: usize) -> String {
    const SUFFIX: &str = "...";
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= SUFFIX.len() {
        return s.chars().take(max).collect();
    }
    let head: String = s.chars().take(max - SUFFIX.len()).collect();
    format!("{}{}", head, SUFFIX)
}

/// One line per event: `[step] node phase`.
pub fn format_event(event: &NodeEvent) -> String {
    let phase = match &event.kind {
        NodeEventKind::Started => "started".to_string(),
        NodeEventKind::Succeeded => "succeeded".to_string(),
        NodeEventKind::Failed { error } => format!("failed: {}", truncate_display(error, 120)),
    };
    format!("[{}] {} {}", event.step, event.node_id, phase)
}

/// Error line plus the partial trace when the run got that far.
pub fn format_run_error(err: &AgentRunError) -> String {
    match err.run_error() {
        Some(run) if run.is_cancelled() => format!("cancelled (trace: [{}])", run.trace()),
        Some(run) => {
            let mut line = format!("error: {}", run.kind());
            if !run.trace().is_empty() {
                line.push_str(&format!("\ntrace: {}", run.trace()));
            }
            line
        }
        None => format!("error: {}", err),
    }
}
