//! Node in the property graph.
//!
//! A `Node` is a cheap, cloneable handle: clones share the same labels,
//! properties and binding. Identity follows the remote binding when both
//! sides are bound and the local allocation otherwise.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::{Binding, FieldGroup, PropertyMap, Staleness, Value};
use crate::Result;

/// The labels attached to a node.
pub type LabelSet = BTreeSet<String>;

/// A node in the property graph.
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

pub(crate) struct NodeInner {
    state: RwLock<NodeState>,
}

#[derive(Default)]
struct NodeState {
    binding: Option<Binding>,
    labels: LabelSet,
    properties: PropertyMap,
    stale: Staleness,
}

impl Node {
    /// A new unbound node with no labels and no properties.
    pub fn new() -> Self {
        Self::from_state(NodeState::default())
    }

    pub fn from_parts(
        labels: impl IntoIterator<Item = impl Into<String>>,
        properties: PropertyMap,
    ) -> Self {
        Self::from_state(NodeState {
            labels: labels.into_iter().map(Into::into).collect(),
            properties,
            ..NodeState::default()
        })
    }

    pub fn with_labels(self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        {
            let mut state = self.0.state.write();
            state.labels.extend(labels.into_iter().map(Into::into));
        }
        self
    }

    pub fn with_property(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.state.write().properties.set(key, value);
        self
    }

    /// A node known only by reference: labels and properties are stale.
    pub(crate) fn remote(binding: Binding) -> Self {
        Self::from_state(NodeState {
            binding: Some(binding),
            stale: Staleness::of(&[FieldGroup::Labels, FieldGroup::Properties]),
            ..NodeState::default()
        })
    }

    fn from_state(state: NodeState) -> Self {
        Node(Arc::new(NodeInner { state: RwLock::new(state) }))
    }

    // ========================================================================
    // Labels
    // ========================================================================

    /// Last known labels. Check [`Node::is_stale`] before trusting them on a
    /// bound node, or read through [`Graph::node_labels`](crate::Graph::node_labels).
    pub fn labels(&self) -> LabelSet {
        self.0.state.read().labels.clone()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.0.state.read().labels.contains(label)
    }

    pub fn add_label(&self, label: impl Into<String>) {
        self.0.state.write().labels.insert(label.into());
    }

    pub fn remove_label(&self, label: &str) -> bool {
        self.0.state.write().labels.remove(label)
    }

    pub fn set_labels(&self, labels: impl IntoIterator<Item = impl Into<String>>) {
        self.0.state.write().labels = labels.into_iter().map(Into::into).collect();
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

    /// Last known properties.
    pub fn properties(&self) -> PropertyMap {
        self.0.state.read().properties.clone()
    }

    pub fn set_properties(&self, properties: PropertyMap) {
        self.0.state.write().properties = properties;
    }

    /// Merge properties into this node (null values remove keys).
    pub fn update(&self, properties: PropertyMap) {
        self.0.state.write().properties.update(properties);
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

    /// The remote reference. Fails on an unbound node.
    pub fn reference(&self) -> Result<String> {
        self.binding()
            .map(|b| b.reference().to_owned())
            .ok_or_else(|| unbound("node"))
    }

    /// The remote numeric ID. Fails on an unbound node.
    pub fn id(&self) -> Result<u64> {
        self.binding().ok_or_else(|| unbound("node"))?.id()
    }

    pub fn is_stale(&self, group: FieldGroup) -> bool {
        self.0.state.read().stale.contains(group)
    }

    pub fn staleness(&self) -> Staleness {
        self.0.state.read().stale
    }

    /// True if `self` and `other` are the same local instance.
    pub fn same_instance(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Attach a binding. With `reset`, every field group becomes stale
    /// until the caller supplies fresh data.
    pub(crate) fn bind(&self, binding: Binding, reset: bool) {
        let mut state = self.0.state.write();
        state.binding = Some(binding);
        if reset {
            state.stale.mark(FieldGroup::Labels);
            state.stale.mark(FieldGroup::Properties);
        }
    }

    pub(crate) fn unbind(&self) {
        let mut state = self.0.state.write();
        state.binding = None;
        state.stale = Staleness::FRESH;
    }

    pub(crate) fn refresh_labels(&self, labels: LabelSet) {
        let mut state = self.0.state.write();
        state.labels = labels;
        state.stale.clear(FieldGroup::Labels);
    }

    pub(crate) fn refresh_properties(&self, properties: PropertyMap) {
        let mut state = self.0.state.write();
        state.properties = properties;
        state.stale.clear(FieldGroup::Properties);
    }

    pub(crate) fn downgrade(&self) -> Weak<NodeInner> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<NodeInner>) -> Option<Node> {
        weak.upgrade().map(Node)
    }

    /// Short name used when rendering bound nodes, e.g. `n42`.
    pub(crate) fn render_name(&self) -> String {
        self.id().map(|id| format!("n{id}")).unwrap_or_default()
    }
}

fn unbound(kind: &str) -> crate::Error {
    crate::Error::BindingError(format!("local {kind} is not bound to a remote entity"))
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Identity
// ============================================================================

impl PartialEq for Node {
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

impl Eq for Node {}

impl Hash for Node {
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

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.read();
        let mut d = f.debug_struct("Node");
        if let Some(b) = &state.binding {
            d.field("ref", &b.reference());
        }
        if state.stale.contains(FieldGroup::Labels) {
            d.field("labels", &"?");
        } else {
            d.field("labels", &state.labels);
        }
        if state.stale.contains(FieldGroup::Properties) {
            d.field("properties", &"?");
        } else {
            d.field("properties", &state.properties.sorted());
        }
        d.finish()
    }
}

/// Cypher-style rendering: `(n42:Person {name: "Alice"})`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.render_name();
        let state = self.0.state.read();
        write!(f, "({name}")?;
        for label in &state.labels {
            write!(f, ":{label}")?;
        }
        let spaced = !name.is_empty() || !state.labels.is_empty();
        write_properties(f, &state.properties, spaced)?;
        write!(f, ")")
    }
}

pub(crate) fn write_properties(
    f: &mut fmt::Formatter<'_>,
    props: &PropertyMap,
    spaced: bool,
) -> fmt::Result {
    if props.is_empty() {
        return Ok(());
    }
    write!(f, "{}{{", if spaced { " " } else { "" })?;
    for (i, (k, v)) in props.sorted().into_iter().enumerate() {
        if i > 0 { write!(f, ", ")?; }
        write!(f, "{k}: {v}")?;
    }
    write!(f, "}}")
}
