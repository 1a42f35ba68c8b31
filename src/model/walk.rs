//! Walks (alternating node/relationship sequences) and traversal
//! composition.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Add;

use smallvec::SmallVec;
use tracing::trace;

use super::{Direction, Node, Relationship, Subgraph};
use crate::{Error, Result};

/// One element of a walk's sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Node(Node),
    Relationship(Relationship),
}

/// Anything that can be viewed as a walk.
pub trait Traversable {
    fn walk(&self) -> TraversableSubgraph;
}

impl<T: Traversable + ?Sized> Traversable for &T {
    fn walk(&self) -> TraversableSubgraph {
        (**self).walk()
    }
}

impl Traversable for Node {
    fn walk(&self) -> TraversableSubgraph {
        TraversableSubgraph::from_node(self.clone())
    }
}

impl Traversable for Relationship {
    fn walk(&self) -> TraversableSubgraph {
        let [start, end] = self.nodes();
        TraversableSubgraph::from_parts(
            SmallVec::from_iter([start, end]),
            SmallVec::from_iter([self.clone()]),
        )
    }
}

/// A subgraph with traversal order: `n0, r0, n1, ..., r(k-1), nk`.
///
/// The sequence always starts and ends on a node. The same node may appear
/// more than once. Equality compares the full ordered walk.
#[derive(Debug, Clone)]
pub struct TraversableSubgraph {
    /// Always has one more element than `relationships`.
    nodes: SmallVec<[Node; 4]>,
    relationships: SmallVec<[Relationship; 4]>,
    subgraph: Subgraph,
}

impl TraversableSubgraph {
    pub fn from_node(node: Node) -> Self {
        Self::from_parts(SmallVec::from_iter([node]), SmallVec::new())
    }

    /// Build from an explicit alternating sequence. Every relationship must
    /// connect the nodes on either side of it, in either direction.
    pub fn from_sequence(sequence: impl IntoIterator<Item = Element>) -> Result<Self> {
        let mut nodes = SmallVec::<[Node; 4]>::new();
        let mut relationships = SmallVec::<[Relationship; 4]>::new();
        for (i, element) in sequence.into_iter().enumerate() {
            match (i % 2, element) {
                (0, Element::Node(n)) => nodes.push(n),
                (1, Element::Relationship(r)) => relationships.push(r),
                (_, other) => {
                    return Err(Error::CompositionError(format!(
                        "walk must alternate node and relationship, found {other:?} at position {i}"
                    )));
                }
            }
        }
        if nodes.is_empty() || nodes.len() != relationships.len() + 1 {
            return Err(Error::CompositionError(
                "walk must start and end on a node".into(),
            ));
        }
        for (i, rel) in relationships.iter().enumerate() {
            let [start, end] = rel.nodes();
            let (a, b) = (&nodes[i], &nodes[i + 1]);
            if !((start == *a && end == *b) || (start == *b && end == *a)) {
                return Err(Error::CompositionError(format!(
                    "relationship {rel} does not connect {a} and {b}"
                )));
            }
        }
        Ok(Self::from_parts(nodes, relationships))
    }

    pub(crate) fn from_parts(
        nodes: SmallVec<[Node; 4]>,
        relationships: SmallVec<[Relationship; 4]>,
    ) -> Self {
        let subgraph = Subgraph::new(nodes.iter().cloned(), relationships.iter().cloned());
        Self { nodes, relationships, subgraph }
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Nodes in walk order, duplicates included.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Relationships in walk order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// The full alternating sequence.
    pub fn sequence(&self) -> Vec<Element> {
        let mut seq = Vec::with_capacity(self.nodes.len() + self.relationships.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                seq.push(Element::Relationship(self.relationships[i - 1].clone()));
            }
            seq.push(Element::Node(node.clone()));
        }
        seq
    }

    pub fn as_subgraph(&self) -> &Subgraph {
        &self.subgraph
    }

    pub fn start_node(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn end_node(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    /// Number of relationships travelled.
    pub fn length(&self) -> usize {
        self.relationships.len()
    }

    /// Unique node count.
    pub fn order(&self) -> usize {
        self.subgraph.order()
    }

    /// Unique relationship count.
    pub fn size(&self) -> usize {
        self.subgraph.size()
    }

    /// The relationship at `index`; negative indices count from the end.
    pub fn get(&self, index: isize) -> Option<&Relationship> {
        resolve_index(index, self.relationships.len()).map(|i| &self.relationships[i])
    }

    /// The node at `index`; negative indices count from the end.
    pub fn node(&self, index: isize) -> Option<&Node> {
        resolve_index(index, self.nodes.len()).map(|i| &self.nodes[i])
    }

    /// Sub-walk covering relationships `start..stop`, with the nodes on
    /// either side. Bounds are in relationship units, may be negative and
    /// are clamped like slice ranges. An empty range is an error.
    pub fn slice(&self, start: Option<isize>, stop: Option<isize>) -> Result<Self> {
        let len = self.length() as isize;
        let first = match start {
            None => 0,
            Some(s) if s < 0 => (s + len).max(0),
            Some(s) => s.min(len),
        };
        let last = match stop {
            None => len,
            Some(s) if s < 0 => s + len,
            Some(s) => s.min(len),
        };
        if last < first {
            return Err(Error::CompositionError(format!(
                "slice {start:?}..{stop:?} of a walk of length {len} is empty"
            )));
        }
        let (first, last) = (first as usize, last as usize);
        Ok(Self::from_parts(
            self.nodes[first..=last].iter().cloned().collect(),
            self.relationships[first..last].iter().cloned().collect(),
        ))
    }

    /// The same walk travelled backwards.
    pub fn reversed(&self) -> Self {
        Self {
            nodes: self.nodes.iter().rev().cloned().collect(),
            relationships: self.relationships.iter().rev().cloned().collect(),
            subgraph: self.subgraph.clone(),
        }
    }

    /// Join `other` onto the end of this walk; see [`traverse`].
    pub fn concat(&self, other: &impl Traversable) -> Result<Self> {
        traverse([self.clone(), other.walk()])
    }

    /// Direction each relationship is travelled in.
    pub fn directions(&self) -> Vec<Direction> {
        self.relationships
            .iter()
            .zip(self.nodes.iter())
            .map(|(rel, from)| rel.direction_from(from).unwrap_or(Direction::Outgoing))
            .collect()
    }
}

fn resolve_index(index: isize, len: usize) -> Option<usize> {
    let i = if index < 0 { len as isize + index } else { index };
    (0..len as isize).contains(&i).then_some(i as usize)
}

impl Traversable for TraversableSubgraph {
    fn walk(&self) -> TraversableSubgraph {
        self.clone()
    }
}

impl PartialEq for TraversableSubgraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.relationships == other.relationships
    }
}

impl Eq for TraversableSubgraph {}

impl Hash for TraversableSubgraph {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nodes.as_slice().hash(state);
        self.relationships.as_slice().hash(state);
    }
}

impl<T: Traversable> Add<T> for TraversableSubgraph {
    type Output = Result<TraversableSubgraph>;

    fn add(self, rhs: T) -> Self::Output {
        self.concat(&rhs)
    }
}

/// `(a)-[:KNOWS]->(b)<-[:KNOWS]-(c)`
impl fmt::Display for TraversableSubgraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nodes[0])?;
        for (i, rel) in self.relationships.iter().enumerate() {
            let direction = rel.direction_from(&self.nodes[i]).unwrap_or(Direction::Outgoing);
            rel.fmt_arrow(f, direction)?;
            write!(f, "{}", self.nodes[i + 1])?;
        }
        Ok(())
    }
}

// ============================================================================
// Traversal composition
// ============================================================================

/// Stitch traversables into one continuous walk.
///
/// Each object is joined at the current end node: forwards if it starts
/// there, backwards if it ends there. Anything else is not contiguous.
/// Node matching uses entity identity.
pub fn traverse<I>(traversables: I) -> Result<TraversableSubgraph>
where
    I: IntoIterator,
    I::Item: Traversable,
{
    let mut iter = traversables.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| Error::CompositionError("nothing to traverse".into()))?
        .walk();

    let TraversableSubgraph { mut nodes, mut relationships, .. } = first;
    for item in iter {
        let next = item.walk();
        let cursor = &nodes[nodes.len() - 1];
        let next = if cursor == next.start_node() {
            next
        } else if cursor == next.end_node() {
            next.reversed()
        } else {
            return Err(Error::CompositionError(format!(
                "objects are not contiguous: cannot append {next} to node {cursor}"
            )));
        };
        nodes.extend(next.nodes.into_iter().skip(1));
        relationships.extend(next.relationships);
    }
    trace!(length = relationships.len(), "walk.traverse");
    Ok(TraversableSubgraph::from_parts(nodes, relationships))
}
