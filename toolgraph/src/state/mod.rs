//! Run state for graph execution.
//!
//! A run accumulates named fields in a [`StateContainer`]. Nodes read the container by
//! reference and return a [`StateDelta`]; the engine overlays each delta with
//! [`StateContainer::merge`]. A [`StateSchema`] partitions fields into Input (required at
//! run start), Output (required at the terminal, returned to the caller) and scratch
//! (everything else, never returned).
//!
//! # Example
//!
//! ```rust
//! use toolgraph::state::{StateContainer, StateDelta};
//!
//! let mut state = StateContainer::new();
//! state.merge(StateDelta::new().set("query", "rust graphs").unwrap());
//! let query: String = state.get("query").unwrap();
//! assert_eq!(query, "rust graphs");
//! ```

mod container;
mod schema;

pub use container::{StateContainer, StateDelta};
pub use schema::{fields, FieldSet, StateSchema};

use thiserror::Error;

/// Errors reading, writing or validating state fields.
///
/// **Interaction**: Returned by [`StateContainer::get`] and [`StateDelta::set`]; used as the
/// cause of `NodeExecution` when a delta writes an undeclared field, and of
/// `RoutingPredicate` when a predicate cannot read state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The field is not present in the container.
    #[error("state field not found: {0}")]
    MissingField(String),

    /// The stored value does not deserialize into the requested type.
    #[error("state field `{field}` has unexpected shape: {source}")]
    InvalidType {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    /// The value could not be serialized into a JSON field.
    #[error("state field `{field}` could not be serialized: {source}")]
    Serialize {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    /// A node delta wrote a field outside the node's declared output set.
    #[error("node wrote undeclared output field `{field}`")]
    UndeclaredOutput { field: String },
}
