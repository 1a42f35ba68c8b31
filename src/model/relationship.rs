//! Relationship (edge) in the property graph.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::node::write_properties;
use super::{Binding, FieldGroup, Node, PropertyMap, Staleness, Value};
use crate::{Error, Result};

/// Type given to a relationship constructed without one.
pub const DEFAULT_TYPE: &str = "TO";

/// Traversal direction of a relationship relative to a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// A marker type whose name supplies a relationship type.
///
/// ```
/// use graph_entities::{Node, Relationship, RelationshipKind};
///
/// struct WorksWith;
/// impl RelationshipKind for WorksWith {}
///
/// let (a, b) = (Node::new(), Node::new());
/// let r = Relationship::of::<WorksWith>(&a, &b);
/// assert_eq!(r.rel_type().as_deref(), Some("WORKS_WITH"));
/// ```
pub trait RelationshipKind {
    fn type_name() -> String {
        let full = std::any::type_name::<Self>();
        let short = full.rsplit("::").next().unwrap_or(full);
        relationship_case(short)
    }
}

/// `WorksWith` → `WORKS_WITH`.
pub fn relationship_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_uppercase());
    }
    out
}

/// A relationship between two nodes. Like [`Node`], a cloneable handle.
#[derive(Clone)]
pub struct Relationship(Arc<RelInner>);

pub(crate) struct RelInner {
    state: RwLock<RelState>,
}

struct RelState {
    binding: Option<Binding>,
    start: Node,
    end: Node,
    rel_type: Option<String>,
    properties: PropertyMap,
    stale: Staleness,
}

impl Relationship {
    pub fn new(start: &Node, rel_type: impl Into<String>, end: &Node) -> Self {
        Self::with_properties(start, rel_type, end, PropertyMap::new())
    }

    pub fn with_properties(
        start: &Node,
        rel_type: impl Into<String>,
        end: &Node,
        properties: PropertyMap,
    ) -> Self {
        Self::from_state(RelState {
            binding: None,
            start: start.clone(),
            end: end.clone(),
            rel_type: Some(rel_type.into()),
            properties,
            stale: Staleness::FRESH,
        })
    }

    /// A relationship of the default type.
    pub fn untyped(start: &Node, end: &Node) -> Self {
        Self::new(start, DEFAULT_TYPE, end)
    }

    /// A relationship whose type is derived from a [`RelationshipKind`].
    pub fn of<K: RelationshipKind>(start: &Node, end: &Node) -> Self {
        Self::new(start, K::type_name(), end)
    }

    /// Build from a list of participating nodes: one node gives a
    /// self-loop, two give start and end. More than two is a hyperedge.
    pub fn from_nodes(nodes: &[Node], rel_type: Option<&str>) -> Result<Self> {
        let rel_type = rel_type.unwrap_or(DEFAULT_TYPE);
        match nodes {
            [] => Err(Error::TypeCastError {
                expected: "at least one endpoint".into(),
                got: "no nodes".into(),
            }),
            [a] => Ok(Self::new(a, rel_type, a)),
            [a, b] => Ok(Self::new(a, rel_type, b)),
            more => Err(Error::HyperedgeError(more.len())),
        }
    }

    pub fn with_property(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.state.write().properties.set(key, value);
        self
    }

    /// A relationship known only by reference: type and properties are stale.
    pub(crate) fn remote(binding: Binding, start: Node, end: Node) -> Self {
        Self::from_state(RelState {
            binding: Some(binding),
            start,
            end,
            rel_type: None,
            properties: PropertyMap::new(),
            stale: Staleness::of(&[FieldGroup::Type, FieldGroup::Properties]),
        })
    }

    fn from_state(state: RelState) -> Self {
        Relationship(Arc::new(RelInner { state: RwLock::new(state) }))
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub fn start_node(&self) -> Node {
        self.0.state.read().start.clone()
    }

    pub fn end_node(&self) -> Node {
        self.0.state.read().end.clone()
    }

    pub fn nodes(&self) -> [Node; 2] {
        let state = self.0.state.read();
        [state.start.clone(), state.end.clone()]
    }

    pub fn is_loop(&self) -> bool {
        let [start, end] = self.nodes();
        start == end
    }

    /// The "other" end of the relationship from the given node.
    pub fn other_node(&self, from: &Node) -> Option<Node> {
        let [start, end] = self.nodes();
        if *from == start { Some(end) }
        else if *from == end { Some(start) }
        else { None }
    }

    /// Direction of travel when this relationship is entered from `from`.
    pub fn direction_from(&self, from: &Node) -> Option<Direction> {
        let [start, end] = self.nodes();
        if *from == start { Some(Direction::Outgoing) }
        else if *from == end { Some(Direction::Incoming) }
        else { None }
    }

    /// Last known type; `None` while the type is stale on a bound
    /// relationship hydrated by reference only.
    pub fn rel_type(&self) -> Option<String> {
        self.0.state.read().rel_type.clone()
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.state.read().properties.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.state.write().properties.set(key, value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.state.write().properties.remove(key)
    }

    pub fn properties(&self) -> PropertyMap {
        self.0.state.read().properties.clone()
    }

    pub fn set_properties(&self, properties: PropertyMap) {
        self.0.state.write().properties = properties;
    }

    // ========================================================================
    // Binding & staleness
    // ========================================================================

    pub fn is_bound(&self) -> bool {
        self.0.state.read().binding.is_some()
    }

    pub fn binding(&self) -> Option<Binding> {
        self.0.state.read().binding.clone()
    }

    pub fn reference(&self) -> Result<String> {
        self.binding()
            .map(|b| b.reference().to_owned())
            .ok_or_else(unbound)
    }

    pub fn id(&self) -> Result<u64> {
        self.binding().ok_or_else(unbound)?.id()
    }

    pub fn is_stale(&self, group: FieldGroup) -> bool {
        self.0.state.read().stale.contains(group)
    }

    pub fn staleness(&self) -> Staleness {
        self.0.state.read().stale
    }

    pub fn same_instance(&self, other: &Relationship) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn bind(&self, binding: Binding, reset: bool) {
        let mut state = self.0.state.write();
        state.binding = Some(binding);
        if reset {
            state.stale.mark(FieldGroup::Type);
            state.stale.mark(FieldGroup::Properties);
        }
    }

    pub(crate) fn unbind(&self) {
        let mut state = self.0.state.write();
        state.binding = None;
        state.stale = Staleness::FRESH;
    }

    pub(crate) fn set_endpoints(&self, start: Node, end: Node) {
        let mut state = self.0.state.write();
        state.start = start;
        state.end = end;
    }

    pub(crate) fn refresh_type(&self, rel_type: String) {
        let mut state = self.0.state.write();
        state.rel_type = Some(rel_type);
        state.stale.clear(FieldGroup::Type);
    }

    pub(crate) fn refresh_properties(&self, properties: PropertyMap) {
        let mut state = self.0.state.write();
        state.properties = properties;
        state.stale.clear(FieldGroup::Properties);
    }

    pub(crate) fn downgrade(&self) -> Weak<RelInner> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<RelInner>) -> Option<Relationship> {
        weak.upgrade().map(Relationship)
    }

    /// Render as `-[:TYPE {..}]->` (or `<-[..]-` when travelled backwards).
    pub(crate) fn fmt_arrow(&self, f: &mut fmt::Formatter<'_>, direction: Direction) -> fmt::Result {
        let name = self.id().map(|id| format!("r{id}")).unwrap_or_default();
        let state = self.0.state.read();
        let rel_type = state.rel_type.as_deref().unwrap_or("?");
        match direction {
            Direction::Outgoing => write!(f, "-[{name}:{rel_type}")?,
            Direction::Incoming => write!(f, "<-[{name}:{rel_type}")?,
        }
        write_properties(f, &state.properties, true)?;
        match direction {
            Direction::Outgoing => write!(f, "]->"),
            Direction::Incoming => write!(f, "]-"),
        }
    }
}

fn unbound() -> Error {
    Error::BindingError("local relationship is not bound to a remote entity".into())
}

// ============================================================================
// Identity
// ============================================================================

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        if self.same_instance(other) {
            return true;
        }
        match (self.binding(), other.binding()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.binding() {
            Some(b) => b.reference().hash(state),
            None => (Arc::as_ptr(&self.0) as usize).hash(state),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.read();
        let mut d = f.debug_struct("Relationship");
        if let Some(b) = &state.binding {
            d.field("ref", &b.reference());
        }
        d.field("start", &state.start.binding().map(|b| b.reference().to_owned()));
        d.field("end", &state.end.binding().map(|b| b.reference().to_owned()));
        d.field("type", &state.rel_type.as_deref().unwrap_or("?"));
        if state.stale.contains(FieldGroup::Properties) {
            d.field("properties", &"?");
        } else {
            d.field("properties", &state.properties.sorted());
        }
        d.finish()
    }
}

/// `(a)-[:KNOWS {since: 1999}]->(b)`
impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [start, end] = self.nodes();
        write!(f, "{start}")?;
        self.fmt_arrow(f, Direction::Outgoing)?;
        write!(f, "{end}")
    }
}
