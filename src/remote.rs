//! # Pull & push
//!
//! Batched reconciliation between local entities and the remote store, and
//! the refreshing accessors built on top of it. Each call is exactly one
//! engine round trip, however many entities it covers.

use tracing::debug;

use crate::engine::{PullRequest, PushOp, QueryEngine};
use crate::model::{FieldGroup, LabelSet, Node, PropertyMap, Relationship, Subgraph};
use crate::{Error, Graph, Result};

impl<E: QueryEngine> Graph<E> {
    /// Refresh labels, properties and types of every member from the remote
    /// store in one batch.
    ///
    /// Every member must be bound. Records that were found are applied even
    /// when others are missing; the missing ones are then reported as
    /// `NotFound`.
    pub async fn pull(&self, target: impl Into<Subgraph>) -> Result<()> {
        let subgraph = target.into();
        let nodes: Vec<&Node> = subgraph.nodes().iter().collect();
        let relationships: Vec<&Relationship> = subgraph.relationships().iter().collect();
        self.pull_members(&nodes, &relationships).await
    }

    async fn pull_members(&self, nodes: &[&Node], relationships: &[&Relationship]) -> Result<()> {
        let mut request = PullRequest::default();
        let nodes = nodes
            .iter()
            .map(|n| n.id().map(|id| (id, *n)))
            .collect::<Result<Vec<_>>>()?;
        let relationships = relationships
            .iter()
            .map(|r| r.id().map(|id| (id, *r)))
            .collect::<Result<Vec<_>>>()?;
        request.nodes = nodes.iter().map(|(id, _)| *id).collect();
        request.relationships = relationships.iter().map(|(id, _)| *id).collect();
        if request.is_empty() {
            return Ok(());
        }

        debug!(nodes = nodes.len(), relationships = relationships.len(), "graph.pull");
        let response = self.engine.pull_batch(request).await?;

        let mut missing = Vec::new();
        for (id, node) in nodes {
            match response.nodes.get(&id) {
                Some(record) => {
                    self.hydrate_node(record, Some(node))?;
                }
                None => missing.push(format!("node {id}")),
            }
        }
        for (id, rel) in relationships {
            match response.relationships.get(&id) {
                Some(record) => {
                    self.hydrate_relationship(record, Some(rel))?;
                }
                None => missing.push(format!("relationship {id}")),
            }
        }
        if !missing.is_empty() {
            return Err(Error::NotFound(missing.join(", ")));
        }
        Ok(())
    }

    /// Write properties and labels of every member back to the remote store
    /// in one batch.
    ///
    /// Every node contributes both a properties write and a labels write.
    /// Field groups that are stale are skipped, since their local value is
    /// not known to be current.
    pub async fn push(&self, target: impl Into<Subgraph>) -> Result<()> {
        let subgraph = target.into();
        let mut ops = Vec::with_capacity(subgraph.order() * 2 + subgraph.size());
        for node in subgraph.nodes() {
            let id = node.id()?;
            if node.is_stale(FieldGroup::Properties) {
                debug!(id, "graph.push.skip_stale_properties");
            } else {
                ops.push(PushOp::NodeProperties { id, properties: node.properties().to_json()? });
            }
            if node.is_stale(FieldGroup::Labels) {
                debug!(id, "graph.push.skip_stale_labels");
            } else {
                ops.push(PushOp::NodeLabels { id, labels: node.labels().into_iter().collect() });
            }
        }
        for rel in subgraph.relationships() {
            let id = rel.id()?;
            if rel.is_stale(FieldGroup::Properties) {
                debug!(id, "graph.push.skip_stale_properties");
            } else {
                ops.push(PushOp::RelationshipProperties { id, properties: rel.properties().to_json()? });
            }
        }
        if ops.is_empty() {
            return Ok(());
        }
        debug!(ops = ops.len(), "graph.push");
        self.engine.push_batch(ops).await
    }

    /// Alias for [`Graph::pull`].
    pub async fn refresh(&self, target: impl Into<Subgraph>) -> Result<()> {
        self.pull(target).await
    }

    // ========================================================================
    // Refreshing accessors
    // ========================================================================

    /// Labels of `node`, refreshed first if they are stale.
    pub async fn node_labels(&self, node: &Node) -> Result<LabelSet> {
        if node.is_bound() && node.is_stale(FieldGroup::Labels) {
            self.pull_members(&[node], &[]).await?;
        }
        Ok(node.labels())
    }

    /// Properties of `node`, refreshed first if they are stale.
    pub async fn node_properties(&self, node: &Node) -> Result<PropertyMap> {
        if node.is_bound() && node.is_stale(FieldGroup::Properties) {
            self.pull_members(&[node], &[]).await?;
        }
        Ok(node.properties())
    }

    /// Properties of `rel`, refreshed first if they are stale.
    pub async fn relationship_properties(&self, rel: &Relationship) -> Result<PropertyMap> {
        if rel.is_bound() && rel.is_stale(FieldGroup::Properties) {
            self.pull_members(&[], &[rel]).await?;
        }
        Ok(rel.properties())
    }

    /// Type of `rel`, refreshed first if it is stale.
    pub async fn relationship_type(&self, rel: &Relationship) -> Result<String> {
        if rel.is_bound() && rel.is_stale(FieldGroup::Type) {
            self.pull_members(&[], &[rel]).await?;
        }
        rel.rel_type()
            .ok_or_else(|| Error::NotFound(format!("type of relationship {}", rel.id().unwrap_or_default())))
    }
}
