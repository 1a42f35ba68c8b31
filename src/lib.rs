//! # graph-entities: client-side property graph entities
//!
//! Nodes, relationships and paths for a remote property graph, modelled on
//! the client: built and composed locally, bound to remote identities, and
//! reconciled with the store on demand.
//!
//! ## Design Principles
//!
//! 1. **Handles, not copies**: `Node` and `Relationship` are cheap cloneable
//!    handles; every clone sees the same labels, properties and binding
//! 2. **One instance per remote identity**: each `Graph` context owns a weak
//!    identity cache, so hydrating a reference twice yields one object
//! 3. **Staleness is explicit**: bound entities track which field groups are
//!    out of date; refreshing is a visible, fallible call
//! 4. **Trait-first collaborator**: `QueryEngine` is the only thing that
//!    talks to the store
//!
//! ## Quick Start
//!
//! ```rust
//! use graph_entities::{path, Graph, MemoryEngine, Node, PropertyMap, Subgraph};
//!
//! # async fn example() -> graph_entities::Result<()> {
//! // Local construction and composition
//! let alice = Node::new().with_labels(["Person"]).with_property("name", "Alice");
//! let bob = Node::new().with_labels(["Person"]).with_property("name", "Bob");
//! let carol = Node::new().with_labels(["Person"]).with_property("name", "Carol");
//! let friends = path![&alice, "KNOWS", &bob, "KNOWS", &carol]?;
//! assert_eq!(friends.length(), 2);
//!
//! // Remote round trip
//! let engine = MemoryEngine::new();
//! let id = engine.create_node(&["Person"], PropertyMap::from([("name", "Dave")]));
//! let graph = Graph::new(engine);
//! let dave = graph.node(id).await?;
//! dave.set("age", 41);
//! graph.push(&dave).await?;
//! graph.pull(Subgraph::from_nodes([dave.clone()])).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Engines
//!
//! | Engine | Description |
//! |--------|-------------|
//! | `MemoryEngine` | In-memory store for testing/embedding |
//! | your own | Implement `QueryEngine` over any transport |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod cast;
pub mod cache;
pub mod engine;
pub mod config;
pub mod hydrate;
mod remote;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    traverse, relationship_case, Binding, Direction, Element, Entity, FieldGroup, LabelSet, List,
    Node, Path, PathItem, PropertyMap, Relationship, RelationshipKind, Staleness, Subgraph, Traversable,
    TraversableSubgraph, Value, DEFAULT_TYPE,
};

// ============================================================================
// Re-exports: Casting, engine, hydration
// ============================================================================

pub use cast::{cast, cast_node, cast_relationship, Castable};
pub use cache::EntityCache;
pub use config::GraphConfig;
pub use engine::{
    EngineStats, MemoryEngine, Parameters, PullRequest, PullResponse, PushOp, QueryEngine,
    QueryResult,
};
pub use hydrate::{Hydrated, Record};

use tracing::debug;

// ============================================================================
// Top-level Graph handle
// ============================================================================

/// One execution context against a remote graph.
///
/// A `Graph` wraps a query engine and owns the identity cache for every
/// entity hydrated through it. Separate `Graph` values never share entity
/// instances; to use an entity elsewhere, rehydrate it by reference.
pub struct Graph<E: QueryEngine> {
    engine: E,
    config: GraphConfig,
    cache: EntityCache,
}

impl<E: QueryEngine> Graph<E> {
    /// A context with default configuration.
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, GraphConfig::default())
    }

    pub fn with_config(engine: E, mut config: GraphConfig) -> Self {
        config.base_uri = config::normalize_base_uri(&config.base_uri);
        let cache = EntityCache::new(config.cache_prune_threshold);
        Self { engine, config, cache }
    }

    /// Access the underlying engine (for advanced use).
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// Remote reference of the node with the given ID.
    pub fn node_reference(&self, id: u64) -> String {
        format!("{}node/{id}", self.config.base_uri)
    }

    /// Remote reference of the relationship with the given ID.
    pub fn relationship_reference(&self, id: u64) -> String {
        format!("{}relationship/{id}", self.config.base_uri)
    }

    /// `reference` relative to the graph root, e.g. `node/42`. References
    /// outside the root are returned unchanged.
    pub fn relative_ref<'a>(&self, reference: &'a str) -> &'a str {
        reference.strip_prefix(self.config.base_uri.as_str()).unwrap_or(reference)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Run a statement and hydrate every cell of every row.
    pub async fn run(&self, statement: &str, parameters: Parameters) -> Result<Vec<Record>> {
        let result = self.engine.run(statement, parameters).await?;
        debug!(rows = result.rows.len(), "graph.run");
        self.hydrate_result(result).await
    }

    /// Run a statement expected to produce one value, and hydrate it.
    pub async fn evaluate(&self, statement: &str, parameters: Parameters) -> Result<Hydrated> {
        let value = self.engine.evaluate(statement, parameters).await?;
        self.hydrate(&value, None).await
    }

    // ========================================================================
    // Lookup by ID
    // ========================================================================

    /// The node with the given ID: the live cached instance if there is
    /// one, otherwise fetched in one round trip.
    pub async fn node(&self, id: u64) -> Result<Node> {
        let reference = self.node_reference(id);
        if let Some(live) = self.cache.node(&reference) {
            return Ok(live);
        }
        let mut response = self
            .engine
            .pull_batch(PullRequest { nodes: vec![id], relationships: Vec::new() })
            .await?;
        let record = response
            .nodes
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("node {id}")))?;
        self.hydrate_node(&record, None)
    }

    /// The relationship with the given ID; see [`Graph::node`].
    pub async fn relationship(&self, id: u64) -> Result<Relationship> {
        let reference = self.relationship_reference(id);
        if let Some(live) = self.cache.relationship(&reference) {
            return Ok(live);
        }
        let mut response = self
            .engine
            .pull_batch(PullRequest { nodes: Vec::new(), relationships: vec![id] })
            .await?;
        let record = response
            .relationships
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("relationship {id}")))?;
        self.hydrate_relationship(&record, None)
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Bind `node` to the remote node with the given ID. Its labels and
    /// properties become stale until pulled.
    ///
    /// Fails if a different live instance is already bound to that node in
    /// this context.
    pub fn bind_node(&self, node: &Node, id: u64) -> Result<()> {
        let reference = self.node_reference(id);
        if let Some(live) = self.cache.node(&reference) {
            if !live.same_instance(node) {
                return Err(Error::BindingError(format!(
                    "another local node is already bound to {reference}"
                )));
            }
            return Ok(());
        }
        if let Some(old) = node.binding() {
            self.cache.remove_node(old.reference(), node);
        }
        node.bind(Binding::new(reference.as_str()), true);
        self.cache.insert_node(&reference, node);
        Ok(())
    }

    /// Bind `rel` to the remote relationship with the given ID; see
    /// [`Graph::bind_node`].
    pub fn bind_relationship(&self, rel: &Relationship, id: u64) -> Result<()> {
        let reference = self.relationship_reference(id);
        if let Some(live) = self.cache.relationship(&reference) {
            if !live.same_instance(rel) {
                return Err(Error::BindingError(format!(
                    "another local relationship is already bound to {reference}"
                )));
            }
            return Ok(());
        }
        if let Some(old) = rel.binding() {
            self.cache.remove_relationship(old.reference(), rel);
        }
        rel.bind(Binding::new(reference.as_str()), true);
        self.cache.insert_relationship(&reference, rel);
        Ok(())
    }

    /// Detach `node` from its remote counterpart. Local values are kept
    /// and become the node's own.
    pub fn unbind_node(&self, node: &Node) {
        if let Some(old) = node.binding() {
            self.cache.remove_node(old.reference(), node);
        }
        node.unbind();
    }

    pub fn unbind_relationship(&self, rel: &Relationship) {
        if let Some(old) = rel.binding() {
            self.cache.remove_relationship(old.reference(), rel);
        }
        rel.unbind();
    }
}

impl Graph<MemoryEngine> {
    /// In-memory graph for testing and embedding.
    pub fn open_memory() -> Self {
        let config = GraphConfig::default();
        let engine = MemoryEngine::with_base_uri(&config.base_uri);
        Self::with_config(engine, config)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation needs a remote binding the entity does not have.
    #[error("Binding error: {0}")]
    BindingError(String),

    #[error("Type cast error: expected {expected}, got {got}")]
    TypeCastError { expected: String, got: String },

    /// Traversables that do not join up, or a malformed walk.
    #[error("Composition error: {0}")]
    CompositionError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Hyperedge error: a relationship joins at most two nodes, got {0}")]
    HyperedgeError(usize),

    /// Reported by the query engine.
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// A raw record that cannot be turned into entities.
    #[error("Hydration error: {0}")]
    HydrationError(String),
}

impl Error {
    /// `NotFound` is an expected runtime outcome; everything else is misuse
    /// or an engine failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
