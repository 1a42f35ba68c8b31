//! End-to-end tests for hydration, identity and on-demand refresh.
//!
//! Raw records come from `MemoryEngine`, either through registered
//! statements or built directly from its store.

use std::sync::Arc;

use async_trait::async_trait;
use graph_entities::{
    Error, FieldGroup, Graph, Hydrated, MemoryEngine, Parameters, PropertyMap, PullRequest,
    PullResponse, PushOp, QueryEngine, QueryResult, Value,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// Helper: Alice -KNOWS-> Bob <-KNOWS- Carol
// ============================================================================

struct Fixture {
    engine: MemoryEngine,
    graph: Graph<MemoryEngine>,
    alice: u64,
    bob: u64,
    carol: u64,
    ab: u64,
    cb: u64,
}

fn fixture() -> Fixture {
    let engine = MemoryEngine::new();
    let alice = engine.create_node(&["Person"], PropertyMap::from([("name", "Alice")]));
    let bob = engine.create_node(&["Person"], PropertyMap::from([("name", "Bob")]));
    let carol = engine.create_node(&["Person"], PropertyMap::from([("name", "Carol")]));
    let ab = engine
        .create_relationship(alice, "KNOWS", bob, PropertyMap::from([("since", 1999)]))
        .unwrap();
    let cb = engine.create_relationship(carol, "KNOWS", bob, PropertyMap::new()).unwrap();
    let graph = Graph::new(engine.clone());
    Fixture { engine, graph, alice, bob, carol, ab, cb }
}

fn row_statement(f: &Fixture) -> &'static str {
    let stmt = "MATCH (a)-[r]->(b) RETURN a, r, b";
    f.engine.respond_to(
        stmt,
        QueryResult::new(["a", "r", "b"]).with_row(vec![
            f.engine.node_record(f.alice).unwrap(),
            f.engine.relationship_record(f.ab).unwrap(),
            f.engine.node_record(f.bob).unwrap(),
        ]),
    );
    stmt
}

/// Wraps a `MemoryEngine` and records every pull request it serves.
struct RecordingEngine {
    inner: MemoryEngine,
    pulls: Mutex<Vec<PullRequest>>,
}

#[async_trait]
impl QueryEngine for RecordingEngine {
    async fn run(&self, statement: &str, parameters: Parameters) -> graph_entities::Result<QueryResult> {
        self.inner.run(statement, parameters).await
    }

    async fn pull_batch(&self, request: PullRequest) -> graph_entities::Result<PullResponse> {
        self.pulls.lock().push(request.clone());
        self.inner.pull_batch(request).await
    }

    async fn push_batch(&self, ops: Vec<PushOp>) -> graph_entities::Result<()> {
        self.inner.push_batch(ops).await
    }
}

// ============================================================================
// 1. Records and identity
// ============================================================================

#[tokio::test]
async fn test_run_hydrates_every_column() {
    let f = fixture();
    let stmt = row_statement(&f);
    let records = f.graph.run(stmt, Parameters::new()).await.unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.columns(), &["a", "r", "b"]);
    let a = record.get("a").unwrap().clone().into_node().unwrap();
    let r = record.get("r").unwrap().clone().into_relationship().unwrap();
    let b = record.get("b").unwrap().clone().into_node().unwrap();

    assert!(r.start_node().same_instance(&a));
    assert!(r.end_node().same_instance(&b));
    assert_eq!(r.rel_type().as_deref(), Some("KNOWS"));
    assert_eq!(r.get("since"), Some(Value::Int(1999)));
    assert!(a.staleness().is_fresh());
    assert!(a.has_label("Person"));

    let err = record.get("missing").unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_rehydration_yields_the_same_instances() {
    let f = fixture();
    let stmt = row_statement(&f);
    let first = f.graph.run(stmt, Parameters::new()).await.unwrap();
    let second = f.graph.run(stmt, Parameters::new()).await.unwrap();

    let a1 = first[0].get("a").unwrap().clone().into_node().unwrap();
    let a2 = second[0].get("a").unwrap().clone().into_node().unwrap();
    assert!(a1.same_instance(&a2));
    assert_eq!(f.graph.cache().live_nodes(), 2);
    assert_eq!(f.graph.cache().live_relationships(), 1);
}

#[tokio::test]
async fn test_contexts_do_not_share_instances() {
    let f = fixture();
    let other = Graph::new(f.engine.clone());
    let mine = f.graph.node(f.alice).await.unwrap();
    let theirs = other.node(f.alice).await.unwrap();
    assert!(!mine.same_instance(&theirs));
    assert_eq!(mine, theirs);
}

#[tokio::test]
async fn test_dropped_entities_leave_the_cache() {
    let f = fixture();
    {
        let _alice = f.graph.node(f.alice).await.unwrap();
        assert_eq!(f.graph.cache().live_nodes(), 1);
    }
    assert_eq!(f.graph.cache().live_nodes(), 0);
    assert!(f.graph.cache().node(&f.graph.node_reference(f.alice)).is_none());
}

// ============================================================================
// 2. Lookup by ID
// ============================================================================

#[tokio::test]
async fn test_node_lookup_hits_cache() {
    let f = fixture();
    let first = f.graph.node(f.bob).await.unwrap();
    let second = f.graph.node(f.bob).await.unwrap();
    assert!(first.same_instance(&second));
    assert_eq!(f.engine.stats().pull_batches, 1);
}

#[tokio::test]
async fn test_relationship_lookup_reuses_cached_endpoints() {
    let f = fixture();
    let carol = f.graph.node(f.carol).await.unwrap();
    let cb = f.graph.relationship(f.cb).await.unwrap();
    assert!(cb.start_node().same_instance(&carol));
    assert_eq!(cb.end_node().id().unwrap(), f.bob);
    assert!(cb.end_node().is_stale(FieldGroup::Properties));
}

#[tokio::test]
async fn test_missing_ids_are_not_found() {
    let f = fixture();
    assert!(f.graph.node(404).await.unwrap_err().is_not_found());
    assert!(f.graph.relationship(404).await.unwrap_err().is_not_found());
}

// ============================================================================
// 3. Stale reads refresh once
// ============================================================================

#[tokio::test]
async fn test_stale_access_refreshes_exactly_once() {
    let f = fixture();
    let record = json!({ "self": f.engine.node_uri(f.alice) });
    let alice = f.graph.hydrate(&record, None).await.unwrap().into_node().unwrap();
    assert!(alice.is_stale(FieldGroup::Properties));
    assert!(alice.is_stale(FieldGroup::Labels));

    f.engine.set_node_property(f.alice, "name", "Alicia").unwrap();
    let props = f.graph.node_properties(&alice).await.unwrap();
    assert_eq!(props.get("name"), Some(&Value::from("Alicia")));
    assert_eq!(f.engine.stats().pull_batches, 1);

    f.graph.node_properties(&alice).await.unwrap();
    let labels = f.graph.node_labels(&alice).await.unwrap();
    assert!(labels.contains("Person"));
    assert_eq!(f.engine.stats().pull_batches, 1);
}

#[tokio::test]
async fn test_accessor_pulls_only_its_own_entity() {
    let f = fixture();
    let engine = Arc::new(RecordingEngine { inner: f.engine.clone(), pulls: Mutex::new(Vec::new()) });
    let graph = Graph::new(Arc::clone(&engine));

    let record = json!({
        "self": f.engine.relationship_uri(f.ab),
        "start": f.engine.node_uri(f.alice),
        "end": f.engine.node_uri(f.bob),
    });
    let ab = graph.hydrate(&record, None).await.unwrap().into_relationship().unwrap();
    assert!(ab.is_stale(FieldGroup::Type));

    assert_eq!(graph.relationship_type(&ab).await.unwrap(), "KNOWS");
    assert_eq!(
        *engine.pulls.lock(),
        vec![PullRequest { nodes: Vec::new(), relationships: vec![f.ab] }]
    );
    assert!(ab.start_node().is_stale(FieldGroup::Labels));
}

#[tokio::test]
async fn test_local_values_need_no_refresh() {
    let f = fixture();
    let local = graph_entities::Node::new().with_property("name", "Dave");
    let props = f.graph.node_properties(&local).await.unwrap();
    assert_eq!(props.len(), 1);
    assert_eq!(f.engine.stats().pull_batches, 0);
}

// ============================================================================
// 4. Paths
// ============================================================================

#[tokio::test]
async fn test_path_with_directions_needs_no_fetch() {
    let f = fixture();
    let record = f
        .engine
        .path_record(&[f.alice, f.bob, f.carol], &[f.ab, f.cb], true)
        .unwrap();
    let path = f.graph.hydrate(&record, None).await.unwrap().into_path().unwrap();
    assert_eq!(path.length(), 2);
    assert_eq!(path.end_node().id().unwrap(), f.carol);
    assert_eq!(path.get(1).unwrap().start_node().id().unwrap(), f.carol);
    assert_eq!(f.engine.stats().pull_batches, 0);
}

#[tokio::test]
async fn test_path_without_directions_costs_one_fetch() {
    let f = fixture();
    f.engine.respond_to(
        "MATCH p = (:Person)-[*2]-(:Person) RETURN p",
        QueryResult::new(["p"]).with_row(vec![f
            .engine
            .path_record(&[f.alice, f.bob, f.carol], &[f.ab, f.cb], false)
            .unwrap()]),
    );
    let path = f
        .graph
        .evaluate("MATCH p = (:Person)-[*2]-(:Person) RETURN p", Parameters::new())
        .await
        .unwrap()
        .into_path()
        .unwrap();
    assert_eq!(f.engine.stats().pull_batches, 1);
    assert_eq!(f.engine.stats().queries, 1);

    let rels = path.relationships();
    assert_eq!(rels[0].start_node().id().unwrap(), f.alice);
    assert_eq!(rels[1].start_node().id().unwrap(), f.carol);
    assert!(rels[1].end_node().same_instance(path.node(1).unwrap()));
}

#[tokio::test]
async fn test_malformed_path_is_rejected() {
    let f = fixture();
    let record = json!({
        "nodes": [f.engine.node_uri(f.alice)],
        "relationships": [f.engine.relationship_uri(f.ab)],
    });
    let err = f.graph.hydrate(&record, None).await.unwrap_err();
    assert!(matches!(err, Error::HydrationError(_)));
}

// ============================================================================
// 5. Envelopes and plain data
// ============================================================================

#[tokio::test]
async fn test_error_block_is_an_execution_error() {
    let f = fixture();
    let record = json!({
        "errors": [{ "code": "Neo.ClientError.Statement.SyntaxError", "message": "Invalid input" }]
    });
    let err = f.graph.hydrate(&record, None).await.unwrap_err();
    assert!(matches!(err, Error::ExecutionError(ref m) if m.contains("Invalid input")));
}

#[tokio::test]
async fn test_results_envelope_hydrates_first_result() {
    let f = fixture();
    let record = json!({
        "results": [{ "columns": ["n"], "data": [[f.engine.node_record(f.bob).unwrap()]] }],
        "errors": [],
    });
    let hydrated = f.graph.hydrate(&record, None).await.unwrap();
    let Hydrated::Records(records) = hydrated else {
        panic!("expected records");
    };
    let bob = records[0].get("n").unwrap().clone().into_node().unwrap();
    assert_eq!(bob.get("name"), Some(Value::from("Bob")));
}

#[tokio::test]
async fn test_lists_scalars_and_unknown_maps() {
    let f = fixture();
    let record = json!([f.engine.node_record(f.alice).unwrap(), 7, { "unexpected": true }]);
    let items = f.graph.hydrate(&record, None).await.unwrap().into_list().unwrap();
    assert_eq!(items.len(), 3);
    assert!(matches!(items[0], Hydrated::Node(_)));
    assert_eq!(items[1].as_value(), Some(&json!(7)));
    assert_eq!(items[2].as_value(), Some(&json!({ "unexpected": true })));
}

#[tokio::test]
async fn test_evaluate_edge_cases() {
    let f = fixture();
    f.engine.respond_to("RETURN nothing", QueryResult::new(["x"]));
    let empty = f.graph.evaluate("RETURN nothing", Parameters::new()).await.unwrap();
    assert_eq!(empty.as_value(), Some(&serde_json::Value::Null));

    let err = f.graph.evaluate("NOT REGISTERED", Parameters::new()).await.unwrap_err();
    assert!(matches!(err, Error::ExecutionError(_)));
}

#[tokio::test]
async fn test_existing_instance_must_match_record_kind() {
    let f = fixture();
    let rel = f.graph.relationship(f.ab).await.unwrap();
    let record = f.engine.node_record(f.alice).unwrap();
    let err = f
        .graph
        .hydrate(&record, Some(&graph_entities::Entity::Relationship(rel)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TypeCastError { .. }));
}
