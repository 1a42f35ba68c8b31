//! In-memory query engine.
//!
//! This is the reference implementation of `QueryEngine`. It keeps a
//! small property graph in HashMaps protected by RwLock and serves it as
//! REST-shaped raw records.
//!
//! ## Limitations
//!
//! - **No query language**: `run()` only answers statements registered with
//!   [`MemoryEngine::respond_to`]. Anything else is an `ExecutionError`.
//! - **Per-collection locks**: a push batch is applied op by op and is not
//!   atomic with respect to concurrent readers.
//!
//! Use this engine for:
//! - Testing hydration, pull and push without a server
//! - Embedding the entity model in applications that don't need persistence

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use super::{EngineStats, Parameters, PullRequest, PullResponse, PushOp, QueryEngine, QueryResult};
use crate::config::{normalize_base_uri, DEFAULT_BASE_URI};
use crate::model::{PropertyMap, Value};
use crate::{Error, Result};

// ============================================================================
// MemoryEngine
// ============================================================================

/// In-memory property graph served through [`QueryEngine`].
///
/// Clones share the same store.
#[derive(Clone)]
pub struct MemoryEngine {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    base_uri: String,
    nodes: RwLock<HashMap<u64, StoredNode>>,
    relationships: RwLock<HashMap<u64, StoredRelationship>>,
    responses: RwLock<HashMap<String, QueryResult>>,
    next_node_id: AtomicU64,
    next_rel_id: AtomicU64,
    queries: AtomicU64,
    pull_batches: AtomicU64,
    push_batches: AtomicU64,
}

#[derive(Debug, Clone, Default)]
struct StoredNode {
    labels: BTreeSet<String>,
    properties: PropertyMap,
}

#[derive(Debug, Clone)]
struct StoredRelationship {
    start: u64,
    end: u64,
    rel_type: String,
    properties: PropertyMap,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::with_base_uri(DEFAULT_BASE_URI)
    }

    /// An engine whose references are formed against `uri`.
    pub fn with_base_uri(uri: &str) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                base_uri: normalize_base_uri(uri),
                nodes: RwLock::new(HashMap::new()),
                relationships: RwLock::new(HashMap::new()),
                responses: RwLock::new(HashMap::new()),
                next_node_id: AtomicU64::new(1),
                next_rel_id: AtomicU64::new(1),
                queries: AtomicU64::new(0),
                pull_batches: AtomicU64::new(0),
                push_batches: AtomicU64::new(0),
            }),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.inner.base_uri
    }

    pub fn node_uri(&self, id: u64) -> String {
        format!("{}node/{id}", self.inner.base_uri)
    }

    pub fn relationship_uri(&self, id: u64) -> String {
        format!("{}relationship/{id}", self.inner.base_uri)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            queries: self.inner.queries.load(Ordering::Relaxed),
            pull_batches: self.inner.pull_batches.load(Ordering::Relaxed),
            push_batches: self.inner.push_batches.load(Ordering::Relaxed),
        }
    }

    /// Answer `statement` with `result` from now on.
    pub fn respond_to(&self, statement: impl Into<String>, result: QueryResult) {
        self.inner.responses.write().insert(statement.into(), result);
    }

    // ========================================================================
    // Node CRUD
    // ========================================================================

    pub fn create_node(&self, labels: &[&str], properties: PropertyMap) -> u64 {
        let id = self.inner.next_node_id.fetch_add(1, Ordering::Relaxed);
        let node = StoredNode {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties,
        };
        self.inner.nodes.write().insert(id, node);
        id
    }

    pub fn set_node_property(&self, id: u64, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut nodes = self.inner.nodes.write();
        let node = nodes.get_mut(&id).ok_or_else(|| missing_node(id))?;
        node.properties.set(key, value);
        Ok(())
    }

    pub fn set_node_labels(&self, id: u64, labels: &[&str]) -> Result<()> {
        let mut nodes = self.inner.nodes.write();
        let node = nodes.get_mut(&id).ok_or_else(|| missing_node(id))?;
        node.labels = labels.iter().map(|l| l.to_string()).collect();
        Ok(())
    }

    pub fn node_labels(&self, id: u64) -> Option<BTreeSet<String>> {
        self.inner.nodes.read().get(&id).map(|n| n.labels.clone())
    }

    pub fn node_properties(&self, id: u64) -> Option<PropertyMap> {
        self.inner.nodes.read().get(&id).map(|n| n.properties.clone())
    }

    /// Remove a node and every relationship attached to it.
    pub fn delete_node(&self, id: u64) -> bool {
        let removed = self.inner.nodes.write().remove(&id).is_some();
        if removed {
            self.inner
                .relationships
                .write()
                .retain(|_, r| r.start != id && r.end != id);
        }
        removed
    }

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    pub fn create_relationship(
        &self,
        start: u64,
        rel_type: &str,
        end: u64,
        properties: PropertyMap,
    ) -> Result<u64> {
        {
            let nodes = self.inner.nodes.read();
            for endpoint in [start, end] {
                if !nodes.contains_key(&endpoint) {
                    return Err(missing_node(endpoint));
                }
            }
        }
        let id = self.inner.next_rel_id.fetch_add(1, Ordering::Relaxed);
        let rel = StoredRelationship { start, end, rel_type: rel_type.to_owned(), properties };
        self.inner.relationships.write().insert(id, rel);
        Ok(id)
    }

    pub fn set_relationship_property(&self, id: u64, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut rels = self.inner.relationships.write();
        let rel = rels.get_mut(&id).ok_or_else(|| missing_relationship(id))?;
        rel.properties.set(key, value);
        Ok(())
    }

    pub fn relationship_properties(&self, id: u64) -> Option<PropertyMap> {
        self.inner.relationships.read().get(&id).map(|r| r.properties.clone())
    }

    pub fn delete_relationship(&self, id: u64) -> bool {
        self.inner.relationships.write().remove(&id).is_some()
    }

    // ========================================================================
    // Raw records
    // ========================================================================

    pub fn node_record(&self, id: u64) -> Result<JsonValue> {
        let nodes = self.inner.nodes.read();
        let node = nodes.get(&id).ok_or_else(|| Error::NotFound(format!("node {id}")))?;
        let data = node.properties.to_json()?;
        Ok(json!({
            "self": self.node_uri(id),
            "data": data,
            "metadata": { "id": id, "labels": node.labels },
        }))
    }

    pub fn relationship_record(&self, id: u64) -> Result<JsonValue> {
        let rels = self.inner.relationships.read();
        let rel = rels.get(&id).ok_or_else(|| Error::NotFound(format!("relationship {id}")))?;
        let data = rel.properties.to_json()?;
        Ok(json!({
            "self": self.relationship_uri(id),
            "start": self.node_uri(rel.start),
            "end": self.node_uri(rel.end),
            "type": rel.rel_type,
            "data": data,
            "metadata": { "id": id, "type": rel.rel_type },
        }))
    }

    /// A path record over the given IDs. Without `directions` the record
    /// leaves them for the reader to work out.
    pub fn path_record(&self, nodes: &[u64], relationships: &[u64], directions: bool) -> Result<JsonValue> {
        let mut record = json!({
            "nodes": nodes.iter().map(|id| self.node_uri(*id)).collect::<Vec<_>>(),
            "relationships": relationships.iter().map(|id| self.relationship_uri(*id)).collect::<Vec<_>>(),
        });
        if directions {
            let rels = self.inner.relationships.read();
            let arrows = relationships
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let rel = rels.get(id).ok_or_else(|| missing_relationship(*id))?;
                    Ok(if nodes.get(i) == Some(&rel.start) { "->" } else { "<-" })
                })
                .collect::<Result<Vec<_>>>()?;
            record["directions"] = json!(arrows);
        }
        Ok(record)
    }

    fn apply(&self, op: PushOp) -> Result<()> {
        match op {
            PushOp::NodeProperties { id, properties } => {
                let properties = PropertyMap::from_json(&properties)?;
                let mut nodes = self.inner.nodes.write();
                nodes.get_mut(&id).ok_or_else(|| missing_node(id))?.properties = properties;
            }
            PushOp::NodeLabels { id, labels } => {
                let mut nodes = self.inner.nodes.write();
                nodes.get_mut(&id).ok_or_else(|| missing_node(id))?.labels =
                    labels.into_iter().collect();
            }
            PushOp::RelationshipProperties { id, properties } => {
                let properties = PropertyMap::from_json(&properties)?;
                let mut rels = self.inner.relationships.write();
                rels.get_mut(&id).ok_or_else(|| missing_relationship(id))?.properties = properties;
            }
        }
        Ok(())
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_node(id: u64) -> Error {
    Error::NotFound(format!("node {id}"))
}

fn missing_relationship(id: u64) -> Error {
    Error::NotFound(format!("relationship {id}"))
}

// ============================================================================
// QueryEngine impl
// ============================================================================

#[async_trait]
impl QueryEngine for MemoryEngine {
    async fn run(&self, statement: &str, _parameters: Parameters) -> Result<QueryResult> {
        self.inner.queries.fetch_add(1, Ordering::Relaxed);
        self.inner
            .responses
            .read()
            .get(statement)
            .cloned()
            .ok_or_else(|| Error::ExecutionError(format!("statement not supported: {statement}")))
    }

    /// Records for every ID that exists; missing IDs are left out.
    async fn pull_batch(&self, request: PullRequest) -> Result<PullResponse> {
        self.inner.pull_batches.fetch_add(1, Ordering::Relaxed);
        let mut response = PullResponse::default();
        for id in &request.nodes {
            match self.node_record(*id) {
                Ok(record) => { response.nodes.insert(*id, record); }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        for id in &request.relationships {
            match self.relationship_record(*id) {
                Ok(record) => { response.relationships.insert(*id, record); }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(response)
    }

    async fn push_batch(&self, ops: Vec<PushOp>) -> Result<()> {
        self.inner.push_batches.fetch_add(1, Ordering::Relaxed);
        debug!(ops = ops.len(), "memory.push_batch");
        for op in ops {
            self.apply(op)?;
        }
        Ok(())
    }
}
