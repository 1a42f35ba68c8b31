//! # Identity cache
//!
//! Maps remote references to the live local instance bound to them, so a
//! context never holds two different `Node` (or `Relationship`) objects for
//! the same remote entity.
//!
//! The cache holds weak handles only: an entry never keeps an entity alive,
//! and dead entries are dropped on lookup or in bulk once the table grows
//! past its sweep mark. After a sweep the mark moves to twice the surviving
//! size, so a table full of live entries is not rescanned on every insert.

use std::sync::Weak;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::trace;

use crate::model::node::NodeInner;
use crate::model::relationship::RelInner;
use crate::model::{Node, Relationship};

/// Entity handles that can be held weakly.
pub(crate) trait Cacheable: Clone {
    type Inner;
    const KIND: &'static str;

    fn downgrade(&self) -> Weak<Self::Inner>;
    fn upgrade(weak: &Weak<Self::Inner>) -> Option<Self>;
    fn same_instance(&self, other: &Self) -> bool;
}

impl Cacheable for Node {
    type Inner = NodeInner;
    const KIND: &'static str = "node";

    fn downgrade(&self) -> Weak<NodeInner> { Node::downgrade(self) }
    fn upgrade(weak: &Weak<NodeInner>) -> Option<Node> { Node::upgrade(weak) }
    fn same_instance(&self, other: &Node) -> bool { Node::same_instance(self, other) }
}

impl Cacheable for Relationship {
    type Inner = RelInner;
    const KIND: &'static str = "relationship";

    fn downgrade(&self) -> Weak<RelInner> { Relationship::downgrade(self) }
    fn upgrade(weak: &Weak<RelInner>) -> Option<Relationship> { Relationship::upgrade(weak) }
    fn same_instance(&self, other: &Relationship) -> bool {
        Relationship::same_instance(self, other)
    }
}

// ============================================================================
// WeakTable
// ============================================================================

struct WeakTable<T: Cacheable> {
    entries: HashMap<String, Weak<T::Inner>>,
    prune_threshold: usize,
    next_sweep: usize,
    sweeps: usize,
}

impl<T: Cacheable> WeakTable<T> {
    fn new(prune_threshold: usize) -> Self {
        Self { entries: HashMap::new(), prune_threshold, next_sweep: prune_threshold, sweeps: 0 }
    }

    fn get(&mut self, reference: &str) -> Option<T> {
        let weak = self.entries.get(reference)?;
        match T::upgrade(weak) {
            Some(live) => Some(live),
            None => {
                self.entries.remove(reference);
                None
            }
        }
    }

    fn insert(&mut self, reference: &str, entity: &T) {
        self.entries.insert(reference.to_owned(), entity.downgrade());
        if self.entries.len() > self.next_sweep {
            self.prune();
            self.next_sweep = self.prune_threshold.max(self.entries.len() * 2);
        }
    }

    fn remove(&mut self, reference: &str, entity: &T) -> bool {
        let matches = match self.entries.get(reference) {
            Some(weak) => T::upgrade(weak).is_none_or(|live| live.same_instance(entity)),
            None => false,
        };
        if matches {
            self.entries.remove(reference);
        }
        matches
    }

    fn prune(&mut self) -> usize {
        self.sweeps += 1;
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            trace!(kind = T::KIND, evicted, remaining = self.entries.len(), "cache.prune");
        }
        evicted
    }

    fn live(&self) -> usize {
        self.entries.values().filter(|w| w.strong_count() > 0).count()
    }
}

// ============================================================================
// EntityCache
// ============================================================================

/// Per-context identity table for nodes and relationships.
pub struct EntityCache {
    nodes: Mutex<WeakTable<Node>>,
    relationships: Mutex<WeakTable<Relationship>>,
}

impl EntityCache {
    pub fn new(prune_threshold: usize) -> Self {
        Self {
            nodes: Mutex::new(WeakTable::new(prune_threshold)),
            relationships: Mutex::new(WeakTable::new(prune_threshold)),
        }
    }

    /// The live node bound to `reference`, if any.
    pub fn node(&self, reference: &str) -> Option<Node> {
        self.nodes.lock().get(reference)
    }

    /// The live relationship bound to `reference`, if any.
    pub fn relationship(&self, reference: &str) -> Option<Relationship> {
        self.relationships.lock().get(reference)
    }

    /// Returns the cached node for `reference`, or inserts the one built by
    /// `make`. The flag is `true` when an existing instance was reused.
    pub fn node_or_insert_with(&self, reference: &str, make: impl FnOnce() -> Node) -> (Node, bool) {
        let mut table = self.nodes.lock();
        if let Some(live) = table.get(reference) {
            return (live, true);
        }
        let node = make();
        table.insert(reference, &node);
        (node, false)
    }

    pub fn relationship_or_insert_with(
        &self,
        reference: &str,
        make: impl FnOnce() -> Relationship,
    ) -> (Relationship, bool) {
        let mut table = self.relationships.lock();
        if let Some(live) = table.get(reference) {
            return (live, true);
        }
        let rel = make();
        table.insert(reference, &rel);
        (rel, false)
    }

    pub(crate) fn insert_node(&self, reference: &str, node: &Node) {
        self.nodes.lock().insert(reference, node);
    }

    pub(crate) fn insert_relationship(&self, reference: &str, rel: &Relationship) {
        self.relationships.lock().insert(reference, rel);
    }

    /// Drop the entry for `reference` if it points at `node` (or at nothing).
    pub(crate) fn remove_node(&self, reference: &str, node: &Node) -> bool {
        self.nodes.lock().remove(reference, node)
    }

    pub(crate) fn remove_relationship(&self, reference: &str, rel: &Relationship) -> bool {
        self.relationships.lock().remove(reference, rel)
    }

    /// Drop every dead entry; returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.nodes.lock().prune() + self.relationships.lock().prune()
    }

    pub fn live_nodes(&self) -> usize {
        self.nodes.lock().live()
    }

    pub fn live_relationships(&self) -> usize {
        self.relationships.lock().live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Binding;

    const REF: &str = "http://localhost:7474/db/data/node/1";

    #[test]
    fn test_same_reference_same_instance() {
        let cache = EntityCache::new(64);
        let (first, reused) = cache.node_or_insert_with(REF, || Node::remote(Binding::new(REF)));
        assert!(!reused);
        let (second, reused) = cache.node_or_insert_with(REF, || Node::remote(Binding::new(REF)));
        assert!(reused);
        assert!(first.same_instance(&second));
    }

    #[test]
    fn test_entries_do_not_keep_entities_alive() {
        let cache = EntityCache::new(64);
        {
            let (_node, _) = cache.node_or_insert_with(REF, || Node::remote(Binding::new(REF)));
            assert_eq!(cache.live_nodes(), 1);
        }
        assert_eq!(cache.live_nodes(), 0);
        assert!(cache.node(REF).is_none());
    }

    #[test]
    fn test_prune_threshold() {
        let cache = EntityCache::new(2);
        for i in 0..3 {
            let reference = format!("node/{i}");
            let _ = cache.node_or_insert_with(&reference, || Node::remote(Binding::new(&reference)));
        }
        // The third insert pushed the table past its threshold while only
        // the node being inserted was alive.
        assert_eq!(cache.nodes.lock().entries.len(), 1);
        assert_eq!(cache.prune(), 1);
    }

    #[test]
    fn test_sweeps_are_amortized_over_live_entries() {
        let cache = EntityCache::new(4);
        let kept: Vec<Node> = (0..1000)
            .map(|i| {
                let reference = format!("node/{i}");
                cache.node_or_insert_with(&reference, || Node::remote(Binding::new(&reference))).0
            })
            .collect();
        let table = cache.nodes.lock();
        assert_eq!(table.entries.len(), kept.len());
        // Marks at 4, 10, 22, ... 766: eight sweeps for a thousand inserts.
        assert!(table.sweeps <= 10, "swept {} times", table.sweeps);
    }

    #[test]
    fn test_remove_only_matching_instance() {
        let cache = EntityCache::new(64);
        let a = Node::remote(Binding::new(REF));
        let b = Node::remote(Binding::new(REF));
        cache.insert_node(REF, &a);
        assert!(!cache.remove_node(REF, &b));
        assert!(cache.node(REF).is_some());
        assert!(cache.remove_node(REF, &a));
        assert!(cache.node(REF).is_none());
    }
}
