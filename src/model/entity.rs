//! Any one of the three graph object kinds.

use std::fmt;

use super::{Node, Path, Relationship, Traversable, TraversableSubgraph};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
    Node(Node),
    Relationship(Relationship),
    Path(Path),
}

impl Entity {
    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Node(_) => "node",
            Entity::Relationship(_) => "relationship",
            Entity::Path(_) => "path",
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Entity::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Entity::Relationship(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Entity::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_node(self) -> Result<Node> {
        match self {
            Entity::Node(n) => Ok(n),
            other => Err(mismatch("node", &other)),
        }
    }

    pub fn into_relationship(self) -> Result<Relationship> {
        match self {
            Entity::Relationship(r) => Ok(r),
            other => Err(mismatch("relationship", &other)),
        }
    }

    pub fn into_path(self) -> Result<Path> {
        match self {
            Entity::Path(p) => Ok(p),
            other => Err(mismatch("path", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Entity) -> Error {
    Error::TypeCastError { expected: expected.into(), got: got.kind().into() }
}

impl Traversable for Entity {
    fn walk(&self) -> TraversableSubgraph {
        match self {
            Entity::Node(n) => n.walk(),
            Entity::Relationship(r) => r.walk(),
            Entity::Path(p) => p.walk(),
        }
    }
}

impl From<Node> for Entity {
    fn from(n: Node) -> Self { Entity::Node(n) }
}

impl From<Relationship> for Entity {
    fn from(r: Relationship) -> Self { Entity::Relationship(r) }
}

impl From<Path> for Entity {
    fn from(p: Path) -> Self { Entity::Path(p) }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Node(n) => fmt::Display::fmt(n, f),
            Entity::Relationship(r) => fmt::Display::fmt(r, f),
            Entity::Path(p) => fmt::Display::fmt(p, f),
        }
    }
}
