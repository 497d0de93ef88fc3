//! Co-occurrence relations.
//!
//! Two entities found in the same record are linked when their kinds match one
//! of the rules below. Nothing is read from the text itself, so an edge means
//! only "these appeared together in one experiment".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::toolkit::entity::{EntityKind, NormalizedEntity};


#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RelationLabel {
    Affects,
    Causes,
    ObservedIn,
    StudiedIn,
    ConductedDuring,
}

impl RelationLabel {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

/// (source kind, target kind, label)
const RULES: &[(EntityKind, EntityKind, RelationLabel)] = &[
    (EntityKind::Condition, EntityKind::Process, RelationLabel::Affects),
    (EntityKind::Condition, EntityKind::Outcome, RelationLabel::Causes),
    (EntityKind::Process, EntityKind::Outcome, RelationLabel::ObservedIn),
    (EntityKind::Process, EntityKind::Organism, RelationLabel::StudiedIn),
    (EntityKind::Outcome, EntityKind::Organism, RelationLabel::ObservedIn),
    (EntityKind::Organism, EntityKind::Mission, RelationLabel::ConductedDuring),
];


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub source: NormalizedEntity,
    pub target: NormalizedEntity,
    pub label: RelationLabel,
    pub provenance: BTreeSet<String>,
}

impl Relation {
    pub fn key(&self) -> (NormalizedEntity, NormalizedEntity, RelationLabel) {
        (self.source.clone(), self.target.clone(), self.label)
    }
}

/// Threads the entity pairs of one record into labeled edges.
pub fn derive_relations(record_id: &str, entities: &BTreeSet<NormalizedEntity>) -> Vec<Relation> {
    let mut relations = Vec::new();

    for (source_kind, target_kind, label) in RULES {
        for source in entities.iter().filter(|e| e.kind == *source_kind) {
            for target in entities.iter().filter(|e| e.kind == *target_kind) {
                relations.push(Relation {
                    source: source.clone(),
                    target: target.clone(),
                    label: *label,
                    provenance: BTreeSet::from([record_id.to_string()]),
                });
            }
        }
    }

    relations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: EntityKind, raw: &str) -> NormalizedEntity {
        NormalizedEntity::new(kind, raw).unwrap()
    }

    #[test]
    fn test_condition_and_process_yield_affects() {
        let entities = BTreeSet::from([
            entity(EntityKind::Condition, "microgravity"),
            entity(EntityKind::Process, "gene expression"),
        ]);

        let relations = derive_relations("A", &entities);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].source.label, "microgravity");
        assert_eq!(relations[0].target.label, "gene expression");
        assert_eq!(relations[0].label, RelationLabel::Affects);
        assert!(relations[0].provenance.contains("A"));
    }

    #[test]
    fn test_full_record_rules() {
        let entities = BTreeSet::from([
            entity(EntityKind::Organism, "Mus musculus"),
            entity(EntityKind::Mission, "STS-135"),
            entity(EntityKind::Condition, "spaceflight"),
            entity(EntityKind::Process, "bone remodeling"),
            entity(EntityKind::Outcome, "bone loss"),
        ]);

        let labels: Vec<(String, &str, String)> = derive_relations("B", &entities)
            .iter()
            .map(|r| (r.source.id(), r.label.as_str(), r.target.id()))
            .collect();

        assert_eq!(
            labels,
            vec![
                ("condition:spaceflight".into(), "affects", "process:bone-remodeling".into()),
                ("condition:spaceflight".into(), "causes", "outcome:bone-loss".into()),
                ("process:bone-remodeling".into(), "observed-in", "outcome:bone-loss".into()),
                ("process:bone-remodeling".into(), "studied-in", "organism:mus-musculus".into()),
                ("outcome:bone-loss".into(), "observed-in", "organism:mus-musculus".into()),
                ("organism:mus-musculus".into(), "conducted-during", "mission:sts-135".into()),
            ]
        );
    }

    #[test]
    fn test_lone_entity_yields_nothing() {
        let entities = BTreeSet::from([entity(EntityKind::Condition, "radiation")]);
        assert!(derive_relations("C", &entities).is_empty());
    }
}
