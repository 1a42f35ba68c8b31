//! # Entity Model
//!
//! Nodes, relationships and paths as they exist on the client side, plus
//! the set algebra and walk composition over them.
//!
//! This module is pure data: no I/O and no async. Everything that talks to
//! a remote store lives on [`Graph`](crate::Graph).

pub mod value;
pub mod property_map;
pub mod binding;
pub mod node;
pub mod relationship;
pub mod subgraph;
pub mod walk;
pub mod path;
pub mod entity;

pub use value::{List, Value};
pub use property_map::PropertyMap;
pub use binding::{Binding, FieldGroup, Staleness};
pub use node::{LabelSet, Node};
pub use relationship::{relationship_case, Direction, Relationship, RelationshipKind, DEFAULT_TYPE};
pub use subgraph::Subgraph;
pub use walk::{traverse, Element, Traversable, TraversableSubgraph};
pub use path::{Path, PathItem};
pub use entity::Entity;
