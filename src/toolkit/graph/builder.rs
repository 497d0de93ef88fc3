use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::models::{GraphEdge, GraphNode, KnowledgeGraph};
use crate::core::records::ExperimentRecord;
use crate::toolkit::entity::{NormalizedEntity, normalize_record};
use crate::toolkit::keywords::{RelationLabel, derive_relations};

type EdgeKey = (NormalizedEntity, NormalizedEntity, RelationLabel);

#[derive(Default)]
struct NodeAccumulator {
    usage: usize,
    provenance: BTreeSet<String>,
}

/// Folds per-record entities and relations into one deduplicated graph.
///
/// Ordered maps make the result independent of the order records are added.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<NormalizedEntity, NodeAccumulator>,
    edges: BTreeMap<EdgeKey, BTreeSet<String>>,
    records: usize,
    skipped: usize,
}

impl GraphBuilder {

    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fresh graph from the full record collection.
    pub fn build(records: &[ExperimentRecord]) -> KnowledgeGraph {
        let mut builder = Self::new();
        for record in records {
            builder.add_record(record);
        }
        builder.finish()
    }


    pub fn add_record(&mut self, record: &ExperimentRecord) {
        let entities = normalize_record(record);
        self.add_entities(&record.id, &entities);
    }

    /// A record without entities contributes nothing.
    pub fn add_entities(&mut self, record_id: &str, entities: &BTreeSet<NormalizedEntity>) {
        self.records += 1;
        if entities.is_empty() {
            self.skipped += 1;
            debug!("Record {} has no graph entities", record_id);
            return;
        }

        for entity in entities {
            let node = self.nodes.entry(entity.clone()).or_default();
            node.usage += 1;
            node.provenance.insert(record_id.to_string());
        }

        for relation in derive_relations(record_id, entities) {
            let key = relation.key();
            self.edges.entry(key).or_default().extend(relation.provenance);
        }
    }


    pub fn finish(self) -> KnowledgeGraph {
        let mut degree: BTreeMap<&NormalizedEntity, usize> = BTreeMap::new();
        for (source, target, _) in self.edges.keys() {
            *degree.entry(source).or_default() += 1;
            *degree.entry(target).or_default() += 1;
        }

        let nodes: Vec<GraphNode> = self
            .nodes
            .iter()
            .map(|(entity, acc)| GraphNode {
                entity: entity.clone(),
                usage: acc.usage,
                degree: degree.get(entity).copied().unwrap_or(0),
                provenance: acc.provenance.clone(),
            })
            .collect();

        let edges: Vec<GraphEdge> = self
            .edges
            .into_iter()
            .map(|((source, target, label), provenance)| GraphEdge {
                source,
                target,
                label,
                provenance,
            })
            .collect();

        debug!(
            "Graph built: {} records ({} without entities), {} nodes, {} edges",
            self.records,
            self.skipped,
            nodes.len(),
            edges.len()
        );

        KnowledgeGraph { nodes, edges }
    }
}
