//! # Query Engine Trait
//!
//! The contract between the entity model and whatever actually talks to
//! the remote store. The model never speaks a wire protocol itself: it
//! hands statements, pull requests and push operations to a
//! [`QueryEngine`] and hydrates the raw JSON records that come back.
//!
//! ## Raw record shapes
//!
//! | Record | Shape |
//! |--------|-------|
//! | Node | `{"self": ref, "data": {..}, "metadata": {"labels": [..]}}` |
//! | Relationship | `{"self": ref, "start": ref, "end": ref, "type": t, "data": {..}}` |
//! | Path | `{"nodes": [ref..], "relationships": [ref..], "directions": ["->" \| "<-"..]}` |
//!
//! ## Implementations
//!
//! | Engine | Module | Description |
//! |--------|--------|-------------|
//! | `MemoryEngine` | `memory` | In-memory store for testing/embedding |

pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{Error, Result};

pub use memory::MemoryEngine;

/// Statement parameters, passed through to the engine untouched.
pub type Parameters = serde_json::Map<String, JsonValue>;

// ============================================================================
// Results
// ============================================================================

/// Raw rows returned by [`QueryEngine::run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl QueryResult {
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    pub fn with_row(mut self, row: Vec<JsonValue>) -> Self {
        self.rows.push(row);
        self
    }

    /// Parse a `{"columns": [..], "data": [[..]..]}` envelope.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let columns = json
            .get("columns")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| Error::HydrationError("result has no columns".into()))?
            .iter()
            .map(|c| c.as_str().map(str::to_owned))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::HydrationError("column names must be strings".into()))?;
        let rows = match json.get("data") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(rows)) => rows
                .iter()
                .map(|row| match row {
                    JsonValue::Array(values) => values.clone(),
                    other => vec![other.clone()],
                })
                .collect(),
            Some(_) => return Err(Error::HydrationError("result data must be a list".into())),
        };
        Ok(Self { columns, rows })
    }
}

/// One batched fetch, keyed by numeric ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub nodes: Vec<u64>,
    pub relationships: Vec<u64>,
}

impl PullRequest {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

/// Raw records for the IDs that were found. Missing IDs are simply absent.
#[derive(Debug, Clone, Default)]
pub struct PullResponse {
    pub nodes: HashMap<u64, JsonValue>,
    pub relationships: HashMap<u64, JsonValue>,
}

/// One write in a push batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PushOp {
    /// Replace every property of a node.
    NodeProperties { id: u64, properties: serde_json::Map<String, JsonValue> },
    /// Replace the label set of a node.
    NodeLabels { id: u64, labels: Vec<String> },
    /// Replace every property of a relationship.
    RelationshipProperties { id: u64, properties: serde_json::Map<String, JsonValue> },
}

/// Round trips an engine has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub queries: u64,
    pub pull_batches: u64,
    pub push_batches: u64,
}

// ============================================================================
// The trait
// ============================================================================

/// The query-execution collaborator.
///
/// Implementations own transport, authentication and retry policy. Every
/// method is one round trip; batching is the caller's job.
#[async_trait]
pub trait QueryEngine: Send + Sync + 'static {
    /// Execute a parameterized statement and return its raw rows.
    async fn run(&self, statement: &str, parameters: Parameters) -> Result<QueryResult>;

    /// Execute a statement expected to produce a single value.
    /// Returns `Null` when there are no rows.
    async fn evaluate(&self, statement: &str, parameters: Parameters) -> Result<JsonValue> {
        let result = self.run(statement, parameters).await?;
        Ok(result
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(JsonValue::Null))
    }

    /// Fetch raw records for the given IDs in one request.
    async fn pull_batch(&self, request: PullRequest) -> Result<PullResponse>;

    /// Apply the given writes in one request.
    async fn push_batch(&self, ops: Vec<PushOp>) -> Result<()>;
}

#[async_trait]
impl<E: QueryEngine + ?Sized> QueryEngine for Arc<E> {
    async fn run(&self, statement: &str, parameters: Parameters) -> Result<QueryResult> {
        (**self).run(statement, parameters).await
    }

    async fn evaluate(&self, statement: &str, parameters: Parameters) -> Result<JsonValue> {
        (**self).evaluate(statement, parameters).await
    }

    async fn pull_batch(&self, request: PullRequest) -> Result<PullResponse> {
        (**self).pull_batch(request).await
    }

    async fn push_batch(&self, ops: Vec<PushOp>) -> Result<()> {
        (**self).push_batch(ops).await
    }
}
