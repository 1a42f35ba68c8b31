//! # Hydration
//!
//! The single funnel through which raw remote records enter the entity
//! model. Every node or relationship record goes through the context's
//! identity cache, so hydrating the same reference twice updates one
//! instance in place.
//!
//! Field groups present in a record become fresh. Groups missing from a
//! record are stale on a newly bound instance and untouched on an instance
//! that was already bound to the same reference.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::engine::{PullRequest, QueryEngine, QueryResult};
use crate::model::{
    Binding, Direction, Element, Entity, LabelSet, Node, Path, PropertyMap, Relationship,
};
use crate::{Error, Graph, Result};

/// A hydrated value: a graph entity, a list of hydrated values, a set of
/// result records, or anything else passed through as raw JSON.
#[derive(Debug, Clone)]
pub enum Hydrated {
    Node(Node),
    Relationship(Relationship),
    Path(Path),
    List(Vec<Hydrated>),
    Records(Vec<Record>),
    Value(JsonValue),
}

impl Hydrated {
    fn kind(&self) -> &'static str {
        match self {
            Hydrated::Node(_) => "node",
            Hydrated::Relationship(_) => "relationship",
            Hydrated::Path(_) => "path",
            Hydrated::List(_) => "list",
            Hydrated::Records(_) => "records",
            Hydrated::Value(_) => "value",
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::TypeCastError { expected: expected.into(), got: self.kind().into() }
    }

    pub fn into_node(self) -> Result<Node> {
        match self {
            Hydrated::Node(n) => Ok(n),
            other => Err(other.mismatch("node")),
        }
    }

    pub fn into_relationship(self) -> Result<Relationship> {
        match self {
            Hydrated::Relationship(r) => Ok(r),
            other => Err(other.mismatch("relationship")),
        }
    }

    pub fn into_path(self) -> Result<Path> {
        match self {
            Hydrated::Path(p) => Ok(p),
            other => Err(other.mismatch("path")),
        }
    }

    pub fn into_entity(self) -> Result<Entity> {
        match self {
            Hydrated::Node(n) => Ok(Entity::Node(n)),
            Hydrated::Relationship(r) => Ok(Entity::Relationship(r)),
            Hydrated::Path(p) => Ok(Entity::Path(p)),
            other => Err(other.mismatch("entity")),
        }
    }

    pub fn into_list(self) -> Result<Vec<Hydrated>> {
        match self {
            Hydrated::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }

    /// The raw value, for non-graph data.
    pub fn as_value(&self) -> Option<&JsonValue> {
        match self {
            Hydrated::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// One hydrated result row.
#[derive(Debug, Clone)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Hydrated>,
}

impl Record {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Hydrated] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Hydrated> {
        self.values
    }

    /// The value in the named column.
    pub fn get(&self, column: &str) -> Result<&Hydrated> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| Error::NotFound(format!("Column '{column}'")))
    }
}

/// Future returned by [`Graph::hydrate`].
pub type HydrateFuture<'a> = Pin<Box<dyn Future<Output = Result<Hydrated>> + Send + 'a>>;

// ============================================================================
// Record field helpers
// ============================================================================

fn str_field<'a>(data: &'a JsonValue, field: &str) -> Result<&'a str> {
    data.get(field)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| Error::HydrationError(format!("record has no {field:?} reference: {data}")))
}

fn str_list<'a>(data: &'a JsonValue, field: &str) -> Result<Vec<&'a str>> {
    data.get(field)
        .and_then(JsonValue::as_array)
        .and_then(|items| items.iter().map(JsonValue::as_str).collect::<Option<Vec<_>>>())
        .ok_or_else(|| Error::HydrationError(format!("record field {field:?} must be a list of strings")))
}

fn payload(data: &JsonValue) -> Result<Option<PropertyMap>> {
    match data.get("data") {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Object(map)) => PropertyMap::from_json(map).map(Some),
        Some(other) => Err(Error::HydrationError(format!("record data must be a map, got {other}"))),
    }
}

fn label_set(data: &JsonValue) -> Result<Option<LabelSet>> {
    let Some(metadata) = data.get("metadata") else { return Ok(None) };
    if metadata.get("labels").is_none() {
        return Ok(None);
    }
    let labels = str_list(metadata, "labels")?;
    Ok(Some(labels.into_iter().map(str::to_owned).collect()))
}

fn parse_direction(marker: &JsonValue) -> Result<Direction> {
    match marker.as_str() {
        Some("->") => Ok(Direction::Outgoing),
        Some("<-") => Ok(Direction::Incoming),
        _ => Err(Error::HydrationError(format!("unknown path direction {marker}"))),
    }
}

fn collect_errors(errors: &[JsonValue]) -> Error {
    let messages: Vec<String> = errors
        .iter()
        .map(|e| match e.get("message").and_then(JsonValue::as_str) {
            Some(message) => match e.get("code").and_then(JsonValue::as_str) {
                Some(code) => format!("{code}: {message}"),
                None => message.to_owned(),
            },
            None => e.to_string(),
        })
        .collect();
    Error::ExecutionError(messages.join("; "))
}

// ============================================================================
// Graph: hydration
// ============================================================================

impl<E: QueryEngine> Graph<E> {
    /// Hydrate any raw record.
    ///
    /// Node and relationship records go through the identity cache (or into
    /// `existing`, when given). Path records without direction markers cost
    /// one batched fetch of their relationships.
    pub fn hydrate<'a>(&'a self, data: &'a JsonValue, existing: Option<&'a Entity>) -> HydrateFuture<'a> {
        Box::pin(async move {
            match data {
                JsonValue::Object(map) => {
                    if let Some(JsonValue::Array(errors)) = map.get("errors") {
                        if !errors.is_empty() {
                            return Err(collect_errors(errors));
                        }
                    }
                    if map.contains_key("self") {
                        if map.contains_key("type") {
                            let existing = match existing {
                                None => None,
                                Some(Entity::Relationship(r)) => Some(r),
                                Some(other) => return Err(mismatch("relationship", other)),
                            };
                            return self.hydrate_relationship(data, existing).map(Hydrated::Relationship);
                        }
                        let existing = match existing {
                            None => None,
                            Some(Entity::Node(n)) => Some(n),
                            Some(other) => return Err(mismatch("node", other)),
                        };
                        return self.hydrate_node(data, existing).map(Hydrated::Node);
                    }
                    if map.contains_key("nodes") && map.contains_key("relationships") {
                        return self.hydrate_path(data).await.map(Hydrated::Path);
                    }
                    if let Some(results) = map.get("results") {
                        let first = results
                            .get(0)
                            .ok_or_else(|| Error::HydrationError("empty results envelope".into()))?;
                        return self.hydrate(first, existing).await;
                    }
                    if map.contains_key("columns") && map.contains_key("data") {
                        let result = QueryResult::from_json(data)?;
                        return self.hydrate_result(result).await.map(Hydrated::Records);
                    }
                    warn!(keys = ?map.keys().collect::<Vec<_>>(), "hydrate.ambiguous_map");
                    Ok(Hydrated::Value(data.clone()))
                }
                JsonValue::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.hydrate(item, None).await?);
                    }
                    Ok(Hydrated::List(out))
                }
                scalar => Ok(Hydrated::Value(scalar.clone())),
            }
        })
    }

    /// Hydrate every cell of a raw result.
    pub(crate) async fn hydrate_result(&self, result: QueryResult) -> Result<Vec<Record>> {
        let columns: Arc<[String]> = result.columns.into();
        let mut records = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let mut values = Vec::with_capacity(row.len());
            for cell in row {
                values.push(self.hydrate(cell, None).await?);
            }
            records.push(Record { columns: Arc::clone(&columns), values });
        }
        Ok(records)
    }

    /// Hydrate a node record, reusing the cached instance for its reference
    /// or writing into `existing`.
    ///
    /// Fails with `BindingError`, leaving everything untouched, when
    /// `existing` is given and a different live instance already holds the
    /// reference in this context.
    pub fn hydrate_node(&self, data: &JsonValue, existing: Option<&Node>) -> Result<Node> {
        let reference = str_field(data, "self")?;
        let properties = payload(data)?;
        let labels = label_set(data)?;
        if let (Some(n), Some(live)) = (existing, self.cache.node(reference)) {
            if !live.same_instance(n) {
                return Err(Error::BindingError(format!(
                    "another local node is already bound to {reference}"
                )));
            }
        }

        let (node, reused) = match existing {
            Some(n) => (n.clone(), true),
            None => self
                .cache
                .node_or_insert_with(reference, || Node::remote(Binding::new(reference))),
        };
        if node.binding().is_none_or(|b| b.reference() != reference) {
            if let Some(old) = node.binding() {
                self.cache.remove_node(old.reference(), &node);
            }
            node.bind(Binding::new(reference), true);
            self.cache.insert_node(reference, &node);
        }
        if let Some(properties) = properties {
            node.refresh_properties(properties);
        }
        if let Some(labels) = labels {
            node.refresh_labels(labels);
        }
        debug!(reference, reused, stale = ?node.staleness(), "hydrate.node");
        Ok(node)
    }

    /// Hydrate a relationship record. Endpoints resolve through the cache;
    /// an unbound endpoint of `existing` is bound in place.
    pub fn hydrate_relationship(
        &self,
        data: &JsonValue,
        existing: Option<&Relationship>,
    ) -> Result<Relationship> {
        let reference = str_field(data, "self")?;
        let properties = payload(data)?;
        let rel_type = match data.get("type") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(t)) => Some(t.clone()),
            Some(other) => {
                return Err(Error::HydrationError(format!("relationship type must be a string, got {other}")));
            }
        };

        if let (Some(r), Some(live)) = (existing, self.cache.relationship(reference)) {
            if !live.same_instance(r) {
                return Err(Error::BindingError(format!(
                    "another local relationship is already bound to {reference}"
                )));
            }
        }

        let current = existing.map(Relationship::nodes);
        let [current_start, current_end] = match current {
            Some([s, e]) => [Some(s), Some(e)],
            None => [None, None],
        };
        let start = self.hydrate_endpoint(str_field(data, "start")?, current_start)?;
        let end = self.hydrate_endpoint(str_field(data, "end")?, current_end)?;

        let (rel, reused) = match existing {
            Some(r) => (r.clone(), true),
            None => self.cache.relationship_or_insert_with(reference, || {
                Relationship::remote(Binding::new(reference), start.clone(), end.clone())
            }),
        };
        rel.set_endpoints(start, end);
        if rel.binding().is_none_or(|b| b.reference() != reference) {
            if let Some(old) = rel.binding() {
                self.cache.remove_relationship(old.reference(), &rel);
            }
            rel.bind(Binding::new(reference), true);
            self.cache.insert_relationship(reference, &rel);
        }
        if let Some(rel_type) = rel_type {
            rel.refresh_type(rel_type);
        }
        if let Some(properties) = properties {
            rel.refresh_properties(properties);
        }
        debug!(reference, reused, stale = ?rel.staleness(), "hydrate.relationship");
        Ok(rel)
    }

    fn hydrate_endpoint(&self, reference: &str, current: Option<Node>) -> Result<Node> {
        if let Some(live) = self.cache.node(reference) {
            return Ok(live);
        }
        let record = json!({ "self": reference });
        match current {
            Some(n) if !n.is_bound() => self.hydrate_node(&record, Some(&n)),
            _ => self.hydrate_node(&record, None),
        }
    }

    /// Hydrate a path record. Missing direction markers are derived from
    /// one batched fetch of the path's relationships.
    pub async fn hydrate_path(&self, data: &JsonValue) -> Result<Path> {
        let node_refs = str_list(data, "nodes")?;
        let rel_refs = str_list(data, "relationships")?;
        if node_refs.len() != rel_refs.len() + 1 {
            return Err(Error::HydrationError(format!(
                "path with {} relationships needs {} nodes, got {}",
                rel_refs.len(),
                rel_refs.len() + 1,
                node_refs.len()
            )));
        }
        let directions = match data.get("directions") {
            Some(JsonValue::Array(markers)) => {
                markers.iter().map(parse_direction).collect::<Result<Vec<_>>>()?
            }
            _ => self.derive_directions(&node_refs, &rel_refs).await?,
        };
        if directions.len() != rel_refs.len() {
            return Err(Error::HydrationError("path directions do not match its relationships".into()));
        }

        let mut sequence = Vec::with_capacity(node_refs.len() + rel_refs.len());
        for (i, node_ref) in node_refs.iter().enumerate() {
            if i > 0 {
                let (start, end) = match directions[i - 1] {
                    Direction::Outgoing => (node_refs[i - 1], node_refs[i]),
                    Direction::Incoming => (node_refs[i], node_refs[i - 1]),
                };
                let record = json!({ "self": rel_refs[i - 1], "start": start, "end": end });
                sequence.push(Element::Relationship(self.hydrate_relationship(&record, None)?));
            }
            let record = json!({ "self": node_ref });
            sequence.push(Element::Node(self.hydrate_node(&record, None)?));
        }
        Path::from_sequence(sequence)
    }

    async fn derive_directions(&self, node_refs: &[&str], rel_refs: &[&str]) -> Result<Vec<Direction>> {
        let ids = rel_refs
            .iter()
            .map(|r| Binding::new(*r).id())
            .collect::<Result<Vec<_>>>()?;
        debug!(relationships = ids.len(), "hydrate.path.directions");
        let mut response = self
            .engine
            .pull_batch(PullRequest { nodes: Vec::new(), relationships: ids.clone() })
            .await?;
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let record = response
                    .relationships
                    .remove(id)
                    .ok_or_else(|| Error::NotFound(format!("relationship {id}")))?;
                let start = str_field(&record, "start")?;
                Ok(if start == node_refs[i] { Direction::Outgoing } else { Direction::Incoming })
            })
            .collect()
    }
}

fn mismatch(expected: &str, got: &Entity) -> Error {
    Error::TypeCastError { expected: expected.into(), got: got.kind().into() }
}
