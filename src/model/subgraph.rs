//! Unordered collections of nodes and relationships.
//!
//! Closure invariant: every endpoint of a member relationship is a member
//! node. All constructors and set operators maintain it.
//!
//! Members are kept as deduplicated lists rather than hashed sets. Binding
//! a node changes its hash, so every lookup builds its set from the
//! members' current identity.

use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr, BitXor, Sub};

use hashbrown::HashSet;

use super::{Entity, Node, Path, Relationship, TraversableSubgraph};

#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
}

fn distinct<T: Clone + Eq + Hash>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

impl Subgraph {
    /// Build from node and relationship collections; relationship
    /// endpoints are added to the node set.
    pub fn new(
        nodes: impl IntoIterator<Item = Node>,
        relationships: impl IntoIterator<Item = Relationship>,
    ) -> Self {
        let relationships = distinct(relationships);
        let endpoints: Vec<Node> = relationships.iter().flat_map(Relationship::nodes).collect();
        let nodes = distinct(nodes.into_iter().chain(endpoints));
        Self { nodes, relationships }
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self::new(nodes, [])
    }

    pub fn from_relationships(relationships: impl IntoIterator<Item = Relationship>) -> Self {
        Self::new([], relationships)
    }

    /// Member nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    fn node_set(&self) -> HashSet<&Node> {
        self.nodes.iter().collect()
    }

    fn relationship_set(&self) -> HashSet<&Relationship> {
        self.relationships.iter().collect()
    }

    /// Number of unique nodes.
    pub fn order(&self) -> usize {
        self.node_set().len()
    }

    /// Number of unique relationships.
    pub fn size(&self) -> usize {
        self.relationship_set().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }

    pub fn contains_node(&self, node: &Node) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    pub fn contains_relationship(&self, rel: &Relationship) -> bool {
        self.relationships.iter().any(|r| r == rel)
    }

    // ========================================================================
    // Set algebra
    // ========================================================================

    pub fn union(&self, other: &Subgraph) -> Subgraph {
        Subgraph::new(
            self.nodes.iter().chain(&other.nodes).cloned(),
            self.relationships.iter().chain(&other.relationships).cloned(),
        )
    }

    pub fn intersection(&self, other: &Subgraph) -> Subgraph {
        let (nodes, rels) = (other.node_set(), other.relationship_set());
        Subgraph::new(
            self.nodes.iter().filter(|n| nodes.contains(n)).cloned(),
            self.relationships.iter().filter(|r| rels.contains(r)).cloned(),
        )
    }

    /// Relationships in `self` but not `other`. Nodes in `self` but not
    /// `other` survive, plus every endpoint of a surviving relationship.
    pub fn difference(&self, other: &Subgraph) -> Subgraph {
        let (nodes, relationships) = self.difference_members(other);
        Subgraph::new(nodes, relationships)
    }

    /// Relationships in exactly one side; nodes in exactly one side plus
    /// the endpoints of every surviving relationship.
    pub fn symmetric_difference(&self, other: &Subgraph) -> Subgraph {
        let left = self.difference_members(other);
        let right = other.difference_members(self);
        Subgraph::new(left.0.into_iter().chain(right.0), left.1.into_iter().chain(right.1))
    }

    fn difference_members(&self, other: &Subgraph) -> (Vec<Node>, Vec<Relationship>) {
        let (nodes, rels) = (other.node_set(), other.relationship_set());
        (
            self.nodes.iter().filter(|n| !nodes.contains(n)).cloned().collect(),
            self.relationships.iter().filter(|r| !rels.contains(r)).cloned().collect(),
        )
    }

    // ========================================================================
    // Summaries
    // ========================================================================

    /// All labels carried by member nodes.
    pub fn labels(&self) -> BTreeSet<String> {
        self.nodes.iter().flat_map(|n| n.labels()).collect()
    }

    /// All known relationship types. Relationships whose type is still
    /// stale contribute nothing.
    pub fn types(&self) -> BTreeSet<String> {
        self.relationships.iter().filter_map(Relationship::rel_type).collect()
    }

    /// All property keys used by any member.
    pub fn keys(&self) -> BTreeSet<String> {
        let node_keys = self.nodes.iter().flat_map(|n| n.properties().into_iter().map(|(k, _)| k));
        let rel_keys = self
            .relationships
            .iter()
            .flat_map(|r| r.properties().into_iter().map(|(k, _)| k));
        node_keys.chain(rel_keys).collect()
    }
}

impl PartialEq for Subgraph {
    fn eq(&self, other: &Self) -> bool {
        self.node_set() == other.node_set() && self.relationship_set() == other.relationship_set()
    }
}

impl Eq for Subgraph {}

/// Order-independent: XOR of member hashes.
impl Hash for Subgraph {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fn one<T: Hash>(item: &T) -> u64 {
            let mut h = DefaultHasher::new();
            item.hash(&mut h);
            h.finish()
        }
        let mut value = 0u64;
        for n in self.node_set() {
            value ^= one(n);
        }
        for r in self.relationship_set() {
            value ^= one(r);
        }
        value.hash(state);
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Node> for Subgraph {
    fn from(n: Node) -> Self { Subgraph::from_nodes([n]) }
}

impl From<&Node> for Subgraph {
    fn from(n: &Node) -> Self { Subgraph::from_nodes([n.clone()]) }
}

impl From<Relationship> for Subgraph {
    fn from(r: Relationship) -> Self { Subgraph::from_relationships([r]) }
}

impl From<&Relationship> for Subgraph {
    fn from(r: &Relationship) -> Self { Subgraph::from_relationships([r.clone()]) }
}

impl From<&TraversableSubgraph> for Subgraph {
    fn from(w: &TraversableSubgraph) -> Self { w.as_subgraph().clone() }
}

impl From<&Path> for Subgraph {
    fn from(p: &Path) -> Self { p.as_walk().as_subgraph().clone() }
}

impl From<&Entity> for Subgraph {
    fn from(e: &Entity) -> Self {
        match e {
            Entity::Node(n) => n.into(),
            Entity::Relationship(r) => r.into(),
            Entity::Path(p) => p.into(),
        }
    }
}

impl From<&Subgraph> for Subgraph {
    fn from(s: &Subgraph) -> Self { s.clone() }
}

impl BitOr for &Subgraph {
    type Output = Subgraph;
    fn bitor(self, rhs: &Subgraph) -> Subgraph { self.union(rhs) }
}

impl BitAnd for &Subgraph {
    type Output = Subgraph;
    fn bitand(self, rhs: &Subgraph) -> Subgraph { self.intersection(rhs) }
}

impl Sub for &Subgraph {
    type Output = Subgraph;
    fn sub(self, rhs: &Subgraph) -> Subgraph { self.difference(rhs) }
}

impl BitXor for &Subgraph {
    type Output = Subgraph;
    fn bitxor(self, rhs: &Subgraph) -> Subgraph { self.symmetric_difference(rhs) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> (Node, Node, Node, Relationship, Relationship, Relationship) {
        let (a, b, c) = (Node::new(), Node::new(), Node::new());
        let ab = Relationship::new(&a, "KNOWS", &b);
        let bc = Relationship::new(&b, "KNOWS", &c);
        let ca = Relationship::new(&c, "LIKES", &a);
        (a, b, c, ab, bc, ca)
    }

    #[test]
    fn test_relationships_close_over_endpoints() {
        let (a, b, _c, ab, _bc, _ca) = triangle();
        let s = Subgraph::from_relationships([ab]);
        assert_eq!(s.order(), 2);
        assert_eq!(s.size(), 1);
        assert!(s.contains_node(&a));
        assert!(s.contains_node(&b));
    }

    #[test]
    fn test_difference_keeps_endpoints_of_survivors() {
        let (a, b, c, ab, bc, _ca) = triangle();
        let left = Subgraph::from_relationships([ab.clone(), bc.clone()]);
        let right = Subgraph::from_relationships([ab.clone()]);
        let diff = &left - &right;
        // a and b are both in `right`, but b is an endpoint of bc.
        assert_eq!(diff.size(), 1);
        assert!(diff.contains_relationship(&bc));
        assert!(diff.contains_node(&b));
        assert!(diff.contains_node(&c));
        assert!(!diff.contains_node(&a));
    }

    #[test]
    fn test_symmetric_difference_keeps_isolated_nodes() {
        let (a, b, c, ab, _bc, _ca) = triangle();
        let d = Node::new();
        let left = Subgraph::new([d.clone()], [ab.clone()]);
        let right = Subgraph::from_nodes([a.clone(), b.clone(), c.clone()]);
        let x = &left ^ &right;
        assert!(x.contains_relationship(&ab));
        assert!(x.contains_node(&d));
        assert!(x.contains_node(&c));
        // a and b are in both node sets but survive as endpoints of ab.
        assert!(x.contains_node(&a));
        assert!(x.contains_node(&b));
    }

    #[test]
    fn test_structural_equality() {
        let (_a, _b, _c, ab, bc, ca) = triangle();
        let s1 = Subgraph::from_relationships([ab.clone(), bc.clone(), ca.clone()]);
        let s2 = Subgraph::from_relationships([ca, ab, bc]);
        assert_eq!(s1, s2);
        assert_eq!(s1.types(), BTreeSet::from(["KNOWS".to_string(), "LIKES".to_string()]));
    }

    #[test]
    fn test_labels_and_keys() {
        let a = Node::new().with_labels(["Person"]).with_property("name", "Alice");
        let b = Node::new().with_labels(["Robot"]);
        let ab = Relationship::new(&a, "BUILT", &b).with_property("year", 2020);
        let s = Subgraph::from_relationships([ab]);
        assert_eq!(s.labels().len(), 2);
        assert_eq!(
            s.keys(),
            BTreeSet::from(["name".to_string(), "year".to_string()])
        );
    }
}
