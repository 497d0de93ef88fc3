use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::toolkit::entity::{EntityKind, NormalizedEntity};
use crate::toolkit::keywords::RelationLabel;


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub entity: NormalizedEntity,
    /// Number of records that mention the entity.
    pub usage: usize,
    /// Distinct edges touching the node, in either direction.
    pub degree: usize,
    pub provenance: BTreeSet<String>,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NormalizedEntity,
    pub target: NormalizedEntity,
    pub label: RelationLabel,
    pub provenance: BTreeSet<String>,
}

impl GraphEdge {
    pub fn weight(&self) -> usize {
        self.provenance.len()
    }
}

/// Immutable graph snapshot. Nodes and edges are kept sorted by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub(crate) nodes: Vec<GraphNode>,
    pub(crate) edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }


    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }


    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }


    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }


    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }


    pub fn node(&self, entity: &NormalizedEntity) -> Option<&GraphNode> {
        self.nodes
            .binary_search_by(|n| n.entity.cmp(entity))
            .ok()
            .map(|pos| &self.nodes[pos])
    }

    /// Looks a node up by kind and raw label, normalizing the label first.
    pub fn find(&self, kind: EntityKind, raw: &str) -> Option<&GraphNode> {
        NormalizedEntity::new(kind, raw).and_then(|entity| self.node(&entity))
    }


    pub fn edge(
        &self,
        source: &NormalizedEntity,
        target: &NormalizedEntity,
        label: RelationLabel,
    ) -> Option<&GraphEdge> {
        self.edges
            .binary_search_by(|e| {
                (&e.source, &e.target, e.label).cmp(&(source, target, label))
            })
            .ok()
            .map(|pos| &self.edges[pos])
    }


    pub fn nodes_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.entity.kind == kind)
    }

    /// Client-facing shape: nodes as `{id, label, type}` and edges as
    /// `{source, target, label}`, plus sizing counters.
    pub fn to_payload(&self) -> GraphPayload {
        GraphPayload {
            nodes: self
                .nodes
                .iter()
                .map(|n| NodePayload {
                    id: n.entity.id(),
                    label: n.entity.label.clone(),
                    node_type: n.entity.kind,
                    usage: n.usage,
                    degree: n.degree,
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| EdgePayload {
                    source: e.source.id(),
                    target: e.target.id(),
                    label: e.label,
                    weight: e.weight(),
                })
                .collect(),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePayload {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: EntityKind,
    pub usage: usize,
    pub degree: usize,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgePayload {
    pub source: String,
    pub target: String,
    pub label: RelationLabel,
    pub weight: usize,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<NodePayload>,
    pub edges: Vec<EdgePayload>,
}
