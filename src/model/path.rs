//! Paths assembled from entities and inline relationship specs.

use std::fmt;

use super::{
    traverse, Element, Node, PropertyMap, Relationship, Traversable, TraversableSubgraph,
};
use crate::{Error, Result};

/// One argument to [`Path::new`].
#[derive(Debug, Clone)]
pub enum PathItem {
    Node(Node),
    Relationship(Relationship),
    Path(Path),
    Walk(TraversableSubgraph),
    /// A fresh node with these properties.
    Properties(PropertyMap),
    /// A fresh node with nothing on it.
    Anonymous,
    /// A relationship of this type between its neighbours.
    Type(String),
    TypeWithProperties(String, PropertyMap),
}

impl From<Node> for PathItem {
    fn from(n: Node) -> Self { PathItem::Node(n) }
}
impl From<&Node> for PathItem {
    fn from(n: &Node) -> Self { PathItem::Node(n.clone()) }
}
impl From<Relationship> for PathItem {
    fn from(r: Relationship) -> Self { PathItem::Relationship(r) }
}
impl From<&Relationship> for PathItem {
    fn from(r: &Relationship) -> Self { PathItem::Relationship(r.clone()) }
}
impl From<Path> for PathItem {
    fn from(p: Path) -> Self { PathItem::Path(p) }
}
impl From<&Path> for PathItem {
    fn from(p: &Path) -> Self { PathItem::Path(p.clone()) }
}
impl From<TraversableSubgraph> for PathItem {
    fn from(w: TraversableSubgraph) -> Self { PathItem::Walk(w) }
}
impl From<PropertyMap> for PathItem {
    fn from(m: PropertyMap) -> Self { PathItem::Properties(m) }
}
impl From<&str> for PathItem {
    fn from(t: &str) -> Self { PathItem::Type(t.to_owned()) }
}
impl From<String> for PathItem {
    fn from(t: String) -> Self { PathItem::Type(t) }
}
impl From<(&str, PropertyMap)> for PathItem {
    fn from((t, props): (&str, PropertyMap)) -> Self {
        PathItem::TypeWithProperties(t.to_owned(), props)
    }
}
impl From<Option<Node>> for PathItem {
    fn from(n: Option<Node>) -> Self {
        n.map_or(PathItem::Anonymous, PathItem::Node)
    }
}

/// A resolved path argument: either a traversable or a relationship spec
/// still waiting for its neighbours.
enum Slot {
    Walk(TraversableSubgraph),
    Spec(String, PropertyMap),
}

/// A walk with no identity of its own beyond its sequence.
///
/// ```
/// use graph_entities::{path, Node};
///
/// let (a, b, c) = (Node::new(), Node::new(), Node::new());
/// let abc = path![&a, "KNOWS", &b, "KNOWS", &c].unwrap();
/// assert_eq!(abc.length(), 2);
/// assert_eq!(abc.order(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    walk: TraversableSubgraph,
}

impl Path {
    /// Build a path from entities and inline specs.
    ///
    /// Maps and anonymous slots become fresh nodes. A type (optionally with
    /// properties) becomes a relationship from the end of the item before it
    /// to the start of the item after it. The result must be contiguous.
    pub fn new(items: impl IntoIterator<Item = PathItem>) -> Result<Self> {
        let mut slots: Vec<Slot> = items
            .into_iter()
            .map(|item| match item {
                PathItem::Node(n) => Slot::Walk(n.walk()),
                PathItem::Relationship(r) => Slot::Walk(r.walk()),
                PathItem::Path(p) => Slot::Walk(p.walk),
                PathItem::Walk(w) => Slot::Walk(w),
                PathItem::Properties(props) => {
                    Slot::Walk(Node::from_parts(Vec::<String>::new(), props).walk())
                }
                PathItem::Anonymous => Slot::Walk(Node::new().walk()),
                PathItem::Type(t) => Slot::Spec(t, PropertyMap::new()),
                PathItem::TypeWithProperties(t, props) => Slot::Spec(t, props),
            })
            .collect();

        for i in 0..slots.len() {
            let Slot::Spec(rel_type, props) = &slots[i] else { continue };
            let start = match i.checked_sub(1).map(|j| &slots[j]) {
                Some(Slot::Walk(prev)) => prev.end_node().clone(),
                _ => return Err(unresolved(rel_type, "preceding")),
            };
            let end = match slots.get(i + 1) {
                Some(Slot::Walk(next)) => next.start_node().clone(),
                _ => return Err(unresolved(rel_type, "following")),
            };
            let rel = Relationship::with_properties(&start, rel_type.clone(), &end, props.clone());
            slots[i] = Slot::Walk(rel.walk());
        }

        let walks = slots.into_iter().filter_map(|slot| match slot {
            Slot::Walk(w) => Some(w),
            Slot::Spec(..) => None,
        });
        Ok(Self { walk: traverse(walks)? })
    }

    /// Wrap an already validated walk.
    pub fn from_walk(walk: TraversableSubgraph) -> Self {
        Self { walk }
    }

    pub fn from_sequence(sequence: impl IntoIterator<Item = Element>) -> Result<Self> {
        TraversableSubgraph::from_sequence(sequence).map(Self::from_walk)
    }

    pub fn as_walk(&self) -> &TraversableSubgraph {
        &self.walk
    }

    pub fn into_walk(self) -> TraversableSubgraph {
        self.walk
    }

    pub fn nodes(&self) -> &[Node] {
        self.walk.nodes()
    }

    pub fn relationships(&self) -> &[Relationship] {
        self.walk.relationships()
    }

    pub fn start_node(&self) -> &Node {
        self.walk.start_node()
    }

    pub fn end_node(&self) -> &Node {
        self.walk.end_node()
    }

    pub fn length(&self) -> usize {
        self.walk.length()
    }

    pub fn order(&self) -> usize {
        self.walk.order()
    }

    pub fn size(&self) -> usize {
        self.walk.size()
    }

    pub fn get(&self, index: isize) -> Option<&Relationship> {
        self.walk.get(index)
    }

    pub fn node(&self, index: isize) -> Option<&Node> {
        self.walk.node(index)
    }

    pub fn slice(&self, start: Option<isize>, stop: Option<isize>) -> Result<Path> {
        self.walk.slice(start, stop).map(Self::from_walk)
    }

    pub fn concat(&self, other: &impl Traversable) -> Result<Path> {
        self.walk.concat(other).map(Self::from_walk)
    }
}

fn unresolved(rel_type: &str, side: &str) -> Error {
    Error::CompositionError(format!(
        "relationship spec {rel_type:?} has no resolved {side} node"
    ))
}

impl Traversable for Path {
    fn walk(&self) -> TraversableSubgraph {
        self.walk.clone()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.walk, f)
    }
}

/// Build a [`Path`] from a list of items convertible into [`PathItem`].
#[macro_export]
macro_rules! path {
    ($($item:expr),+ $(,)?) => {
        $crate::Path::new([$($crate::PathItem::from($item)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_shared_middle_node_appears_once_in_order() {
        let (a, b, c) = (Node::new(), Node::new(), Node::new());
        let abc = Path::new([
            PathItem::from(&a),
            "KNOWS".into(),
            PathItem::from(&b),
            "KNOWS".into(),
            PathItem::from(&c),
        ])
        .unwrap();
        assert_eq!(abc.nodes(), &[a.clone(), b.clone(), c.clone()]);
        assert_eq!(abc.order(), 3);
        assert_eq!(abc.size(), 2);
        assert_eq!(abc.relationships()[0].start_node(), a);
        assert_eq!(abc.relationships()[1].end_node(), c);
    }

    #[test]
    fn test_fillers_become_nodes() {
        let p = Path::new([
            PathItem::Anonymous,
            PathItem::TypeWithProperties("LIKES".into(), PropertyMap::from([("since", 2001)])),
            PathItem::Properties(PropertyMap::from([("name", "Bob")])),
        ])
        .unwrap();
        assert_eq!(p.length(), 1);
        assert_eq!(p.end_node().get("name"), Some(Value::from("Bob")));
        assert_eq!(p.get(0).and_then(|r| r.get("since")), Some(Value::Int(2001)));
    }

    #[test]
    fn test_spec_next_to_spec_is_error() {
        let (a, b) = (Node::new(), Node::new());
        let result = Path::new([
            PathItem::from(&a),
            "KNOWS".into(),
            "LIKES".into(),
            PathItem::from(&b),
        ]);
        assert!(matches!(result, Err(Error::CompositionError(_))));
        assert!(matches!(
            Path::new([PathItem::from("KNOWS"), PathItem::from(&a)]),
            Err(Error::CompositionError(_))
        ));
    }

    #[test]
    fn test_reversed_splice() {
        let (a, b, c) = (Node::new(), Node::new(), Node::new());
        let r1 = Relationship::new(&a, "KNOWS", &b);
        let r2 = Relationship::new(&c, "KNOWS", &b);
        let p = Path::new([PathItem::from(&r1), PathItem::from(&r2)]).unwrap();
        assert_eq!(
            p.as_walk().sequence(),
            vec![
                Element::Node(a),
                Element::Relationship(r1),
                Element::Node(b),
                Element::Relationship(r2),
                Element::Node(c),
            ]
        );
    }

    #[test]
    fn test_macro_and_display() {
        let a = Node::new().with_property("name", "Alice");
        let b = Node::new().with_property("name", "Bob");
        let c = Node::new().with_property("name", "Carol");
        let cb = Relationship::new(&c, "KNOWS", &b);
        let p = crate::path![&a, "KNOWS", &b, &cb, &c].unwrap();
        assert_eq!(
            p.to_string(),
            "({name: \"Alice\"})-[:KNOWS]->({name: \"Bob\"})<-[:KNOWS]-({name: \"Carol\"})"
        );
    }
}
