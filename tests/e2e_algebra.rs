//! End-to-end tests for subgraph set algebra.
//!
//! Subgraphs are drawn from a fixed pool of nodes and relationships so that
//! proptest can pick arbitrary member sets by index.

use graph_entities::{Graph, Node, Relationship, Subgraph};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ============================================================================
// Helper: a small multigraph to draw subgraphs from.
//
// n0 -> n1 -> n2 -> n3, n3 -> n0, a self-loop on n4, a parallel n0 -> n1
// edge, and an isolated n5.
// ============================================================================

struct Pool {
    nodes: Vec<Node>,
    rels: Vec<Relationship>,
}

fn pool() -> Pool {
    let nodes: Vec<Node> = (0..6).map(|i| Node::new().with_property("i", i)).collect();
    let edge = |a: usize, t: &str, b: usize| Relationship::new(&nodes[a], t, &nodes[b]);
    let rels = vec![
        edge(0, "NEXT", 1),
        edge(1, "NEXT", 2),
        edge(2, "NEXT", 3),
        edge(3, "BACK", 0),
        edge(4, "SELF", 4),
        edge(0, "ALSO", 1),
    ];
    Pool { nodes, rels }
}

impl Pool {
    fn pick(&self, node_ix: &[usize], rel_ix: &[usize]) -> Subgraph {
        Subgraph::new(
            node_ix.iter().map(|i| self.nodes[*i].clone()),
            rel_ix.iter().map(|i| self.rels[*i].clone()),
        )
    }
}

fn is_closed(s: &Subgraph) -> bool {
    s.relationships()
        .iter()
        .all(|r| r.nodes().iter().all(|n| s.contains_node(n)))
}

fn indices(max: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..max, 0..max)
}

// ============================================================================
// 1. Closure
// ============================================================================

#[test]
fn test_relationship_set_closes_over_endpoints() {
    let p = pool();
    let s = Subgraph::from_relationships(p.rels.clone());
    assert_eq!(s.order(), 5);
    assert_eq!(s.size(), 6);
    assert!(!s.contains_node(&p.nodes[5]));
    assert!(is_closed(&s));
}

#[test]
fn test_self_loop_contributes_one_node() {
    let p = pool();
    let s = Subgraph::from_relationships([p.rels[4].clone()]);
    assert_eq!(s.order(), 1);
    assert_eq!(s.size(), 1);
}

#[test]
fn test_parallel_edges_are_distinct() {
    let p = pool();
    let s = Subgraph::from_relationships([p.rels[0].clone(), p.rels[5].clone()]);
    assert_eq!(s.order(), 2);
    assert_eq!(s.size(), 2);
}

// ============================================================================
// 2. Operators
// ============================================================================

#[test]
fn test_operators_match_methods() {
    let p = pool();
    let a = p.pick(&[5], &[0, 1]);
    let b = p.pick(&[], &[1, 2]);
    assert_eq!(&a | &b, a.union(&b));
    assert_eq!(&a & &b, a.intersection(&b));
    assert_eq!(&a - &b, a.difference(&b));
    assert_eq!(&a ^ &b, a.symmetric_difference(&b));
}

#[test]
fn test_intersection_keeps_shared_relationship_endpoints() {
    let p = pool();
    let a = p.pick(&[], &[0, 1]);
    let b = p.pick(&[], &[1, 2]);
    let both = &a & &b;
    assert_eq!(both.size(), 1);
    assert_eq!(both.order(), 2);
    assert!(both.contains_relationship(&p.rels[1]));
}

#[test]
fn test_equal_subgraphs_hash_equal() {
    use std::collections::HashSet;
    let p = pool();
    let a = p.pick(&[5], &[0, 1]);
    let b = p.pick(&[5, 0], &[1, 0]);
    let set: HashSet<Subgraph> = [a, b].into_iter().collect();
    assert_eq!(set.len(), 1);
}

#[test]
fn test_binding_a_member_keeps_membership_and_equality() {
    let a = Node::new().with_property("name", "Alice");
    let b = Node::new().with_property("name", "Bob");
    let ab = Relationship::new(&a, "KNOWS", &b);
    let s = Subgraph::from_relationships([ab.clone()]);
    let before = s.clone();

    let graph = Graph::open_memory();
    graph.bind_node(&a, 1).unwrap();

    assert!(s.contains_node(&a));
    assert!(s.contains_relationship(&ab));
    assert_eq!(s.order(), 2);
    assert_eq!(s, s.clone());
    assert_eq!(s, before);
    assert_eq!(&s & &before, s);
    assert_eq!((&s - &before).order(), 0);

    // An instance from another context bound to the same reference is equal.
    let other = Node::new();
    Graph::open_memory().bind_node(&other, 1).unwrap();
    assert!(s.contains_node(&other));
    assert_eq!(Subgraph::from_nodes([a.clone(), other]).order(), 1);
}

// ============================================================================
// 3. Laws
// ============================================================================

proptest! {
    #[test]
    fn prop_every_result_is_closed(
        an in indices(6), ar in indices(6), bn in indices(6), br in indices(6),
    ) {
        let p = pool();
        let a = p.pick(&an, &ar);
        let b = p.pick(&bn, &br);
        for s in [&a | &b, &a & &b, &a - &b, &a ^ &b] {
            prop_assert!(is_closed(&s));
        }
    }

    #[test]
    fn prop_union_order_is_bounded(
        an in indices(6), ar in indices(6), bn in indices(6), br in indices(6),
    ) {
        let p = pool();
        let a = p.pick(&an, &ar);
        let b = p.pick(&bn, &br);
        let u = &a | &b;
        prop_assert!(u.order() <= a.order() + b.order());
        prop_assert!(u.size() <= a.size() + b.size());
    }

    #[test]
    fn prop_union_absorbs_intersection(
        an in indices(6), ar in indices(6), bn in indices(6), br in indices(6),
    ) {
        let p = pool();
        let a = p.pick(&an, &ar);
        let b = p.pick(&bn, &br);
        let i = &a & &b;
        prop_assert_eq!(&(&a | &b) & &i, i);
    }

    #[test]
    fn prop_union_and_intersection_commute(
        an in indices(6), ar in indices(6), bn in indices(6), br in indices(6),
    ) {
        let p = pool();
        let a = p.pick(&an, &ar);
        let b = p.pick(&bn, &br);
        prop_assert_eq!(&a | &b, &b | &a);
        prop_assert_eq!(&a & &b, &b & &a);
    }

    #[test]
    fn prop_symmetric_difference_is_union_of_differences(
        an in indices(6), ar in indices(6), bn in indices(6), br in indices(6),
    ) {
        let p = pool();
        let a = p.pick(&an, &ar);
        let b = p.pick(&bn, &br);
        prop_assert_eq!(&a ^ &b, &(&a - &b) | &(&b - &a));
    }
}
