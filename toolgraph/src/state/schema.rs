//! Field sets and the Input/Output partition of a graph's state.

use std::collections::BTreeSet;

use super::StateContainer;

/// Ordered set of field names (deterministic iteration for error reporting).
pub type FieldSet = BTreeSet<String>;

/// Builds a [`FieldSet`] from string-like names: `fields(["conversation", "tool_catalog"])`.
pub fn fields<I, T>(names: I) -> FieldSet
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

/// Input and Output field declarations of a graph. Fields in neither set are scratch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSchema {
    input: FieldSet,
    output: FieldSet,
}

impl StateSchema {
    pub fn new(input: FieldSet, output: FieldSet) -> Self {
        Self { input, output }
    }

    pub fn input(&self) -> &FieldSet {
        &self.input
    }

    pub fn output(&self) -> &FieldSet {
        &self.output
    }

    /// True when `field` is neither an Input nor an Output field.
    pub fn is_scratch(&self, field: &str) -> bool {
        !self.input.contains(field) && !self.output.contains(field)
    }

    /// Input fields absent from `state`.
    pub fn missing_inputs(&self, state: &StateContainer) -> Vec<String> {
        state.missing(self.input.iter().map(String::as_str))
    }

    /// Output fields absent from `state`.
    pub fn missing_outputs(&self, state: &StateContainer) -> Vec<String> {
        state.missing(self.output.iter().map(String::as_str))
    }

    /// The caller-visible view of `state`: Output fields only.
    pub fn output_view(&self, state: &StateContainer) -> StateContainer {
        state.project(self.output.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateDelta;
    use serde_json::json;

    /// **Scenario**: Scratch fields are those outside both Input and Output.
    #[test]
    fn scratch_is_complement_of_input_and_output() {
        let schema = StateSchema::new(fields(["q"]), fields(["answer"]));
        assert!(!schema.is_scratch("q"));
        assert!(!schema.is_scratch("answer"));
        assert!(schema.is_scratch("request"));
    }

    /// **Scenario**: output_view hides Input and scratch fields.
    #[test]
    fn output_view_hides_non_output_fields() {
        let schema = StateSchema::new(fields(["q"]), fields(["answer"]));
        let state = StateContainer::new().merged(
            StateDelta::new()
                .with_value("q", json!("hi"))
                .with_value("request", json!({}))
                .with_value("answer", json!("hello")),
        );
        let view = schema.output_view(&state);
        assert_eq!(view.field_names().collect::<Vec<_>>(), vec!["answer"]);
        assert!(schema.missing_inputs(&state).is_empty());
        assert!(schema.missing_outputs(&StateContainer::new()) == vec!["answer".to_string()]);
    }
}
