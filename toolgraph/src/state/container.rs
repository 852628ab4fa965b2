//! StateContainer and StateDelta: monotonic, field-wise merge.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StateError;

/// Named fields accumulated during one run.
///
/// Values are stored as JSON so that any node can contribute fields without the graph
/// fixing a single state struct; typed access goes through [`get`](Self::get).
/// Fields are only ever added or overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateContainer {
    fields: BTreeMap<String, Value>,
}

impl StateContainer {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container holding exactly the fields of `delta`.
    pub fn from_delta(delta: StateDelta) -> Self {
        Self {
            fields: delta.fields,
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Raw JSON value of a field.
    pub fn get_value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Deserializes a field into `T`.
    ///
    /// Returns `StateError::MissingField` when absent and `StateError::InvalidType` when the
    /// stored value has a different shape.
    pub fn get<T: DeserializeOwned>(&self, field: &str) -> Result<T, StateError> {
        let value = self
            .fields
            .get(field)
            .ok_or_else(|| StateError::MissingField(field.to_string()))?;
        T::deserialize(value).map_err(|source| StateError::InvalidType {
            field: field.to_string(),
            source,
        })
    }

    /// Like [`get`](Self::get) but maps an absent or `null` field to `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, StateError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|source| StateError::InvalidType {
                    field: field.to_string(),
                    source,
                }),
        }
    }

    /// Overlays the fields present in `delta`; fields not in `delta` are untouched.
    pub fn merge(&mut self, delta: StateDelta) {
        self.fields.extend(delta.fields);
    }

    /// Consuming variant of [`merge`](Self::merge).
    pub fn merged(mut self, delta: StateDelta) -> Self {
        self.merge(delta);
        self
    }

    /// Returns a container with only the named fields that are present.
    pub fn project<'a, I>(&self, fields: I) -> StateContainer
    where
        I: IntoIterator<Item = &'a str>,
    {
        let fields = fields
            .into_iter()
            .filter_map(|name| {
                self.fields
                    .get(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect();
        StateContainer { fields }
    }

    /// Names from `fields` that are absent, in iteration order.
    pub fn missing<'a, I>(&self, fields: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        fields
            .into_iter()
            .filter(|name| !self.fields.contains_key(*name))
            .map(str::to_string)
            .collect()
    }
}

/// Partial state produced by one node: the fields it sets.
///
/// An empty delta is a no-op when merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    fields: BTreeMap<String, Value>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `value` into `field`. Chain with `?`:
    /// `StateDelta::new().set("a", 1)?.set("b", "x")?`.
    pub fn set(
        mut self,
        field: impl Into<String>,
        value: impl Serialize,
    ) -> Result<Self, StateError> {
        self.insert(field, value)?;
        Ok(self)
    }

    /// Sets a raw JSON value.
    pub fn with_value(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Serialize,
    ) -> Result<(), StateError> {
        let field = field.into();
        let value = serde_json::to_value(value).map_err(|source| StateError::Serialize {
            field: field.clone(),
            source,
        })?;
        self.fields.insert(field, value);
        Ok(())
    }

    /// Combines two deltas; fields of `other` win on conflict.
    pub fn merge(&mut self, other: StateDelta) {
        self.fields.extend(other.fields);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get_value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl From<StateDelta> for StateContainer {
    fn from(delta: StateDelta) -> Self {
        StateContainer::from_delta(delta)
    }
}
