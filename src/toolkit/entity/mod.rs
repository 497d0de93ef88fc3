pub mod vocabulary;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::core::records::ExperimentRecord;
use crate::utils::normalize_label;

pub use vocabulary::{canonical_organism, classify_term};


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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Organism,
    Mission,
    Condition,
    Process,
    Outcome,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, canonical concept. Identity is the (kind, label) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NormalizedEntity {
    pub kind: EntityKind,
    pub label: String,
}

impl NormalizedEntity {
    /// Normalizes `raw` as an entity of `kind`.
    ///
    /// Organisms go through the alias table, missions pass through, and
    /// vocabulary kinds must match a known term of the same kind exactly.
    pub fn new(kind: EntityKind, raw: &str) -> Option<Self> {
        let label = normalize_label(raw);
        if label.is_empty() {
            return None;
        }

        let label = match kind {
            EntityKind::Organism => canonical_organism(&label).to_string(),
            EntityKind::Mission => label,
            _ => {
                if classify_term(&label) != Some(kind) {
                    return None;
                }
                label
            }
        };

        Some(Self { kind, label })
    }

    /// Promotes a free-text keyword to a condition, process or outcome.
    pub fn from_term(raw: &str) -> Option<Self> {
        let label = normalize_label(raw);
        classify_term(&label).map(|kind| Self { kind, label })
    }

    /// Stable wire id, e.g. `condition:microgravity` or `process:gene-expression`.
    pub fn id(&self) -> String {
        format!("{}:{}", self.kind, self.label.replace(' ', "-"))
    }
}

impl fmt::Display for NormalizedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Entities drawn from a record's organism, mission, keywords and factors.
/// Unmatched keywords are dropped.
pub fn normalize_record(record: &ExperimentRecord) -> BTreeSet<NormalizedEntity> {
    let mut entities = BTreeSet::new();

    if let Some(organism) = NormalizedEntity::new(EntityKind::Organism, &record.organism) {
        entities.insert(organism);
    }
    if let Some(mission) = NormalizedEntity::new(EntityKind::Mission, &record.mission) {
        entities.insert(mission);
    }

    entities.extend(
        record
            .keywords
            .iter()
            .chain(record.factors.iter())
            .filter_map(|term| NormalizedEntity::from_term(term)),
    );

    entities
}

/// [`normalize_record`] plus every extracted keyword that matches the
/// vocabulary, so description-only records still yield conditions, processes
/// and outcomes.
pub fn normalize_with_keywords<'a>(
    record: &ExperimentRecord,
    extracted: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<NormalizedEntity> {
    let mut entities = normalize_record(record);
    entities.extend(extracted.into_iter().filter_map(NormalizedEntity::from_term));
    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_normalization_is_idempotent() {
        let once = NormalizedEntity::new(EntityKind::Organism, "Arabidopsis thaliana ").unwrap();
        let twice = NormalizedEntity::new(EntityKind::Organism, &once.label).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.id(), "organism:arabidopsis-thaliana");

        let plain = NormalizedEntity::new(EntityKind::Organism, "arabidopsis thaliana").unwrap();
        assert_eq!(once.id(), plain.id());
    }

    #[test]
    fn test_genus_alias_merges_with_binomial() {
        let short = NormalizedEntity::new(EntityKind::Organism, "Arabidopsis").unwrap();
        let full = NormalizedEntity::new(EntityKind::Organism, "ARABIDOPSIS  THALIANA").unwrap();
        assert_eq!(short, full);
    }

    #[test]
    fn test_vocabulary_kind_must_match() {
        assert!(NormalizedEntity::new(EntityKind::Condition, "Microgravity").is_some());
        assert!(NormalizedEntity::new(EntityKind::Process, "microgravity").is_none());
        assert!(NormalizedEntity::new(EntityKind::Condition, "micro-gravity").is_none());
    }

    #[test]
    fn test_missions_pass_through() {
        let mission = NormalizedEntity::new(EntityKind::Mission, "ISS  Expedition-45").unwrap();
        assert_eq!(mission.label, "iss expedition 45");
        assert_eq!(mission.id(), "mission:iss-expedition-45");
        assert!(NormalizedEntity::new(EntityKind::Mission, "  ").is_none());
    }

    #[test]
    fn test_normalize_record_drops_unmatched_keywords() {
        let record = ExperimentRecord::new("GLDS-47", "Muscle Atrophy in Microgravity")
            .with_organism("Mus musculus")
            .with_mission("STS-135")
            .with_keywords(["Muscle Atrophy", "plants", "microgravity"])
            .with_factors(["Spaceflight"]);

        let labels: Vec<String> = normalize_record(&record).iter().map(|e| e.id()).collect();
        assert_eq!(
            labels,
            vec![
                "organism:mus-musculus",
                "mission:sts-135",
                "condition:microgravity",
                "condition:spaceflight",
                "outcome:muscle-atrophy",
            ]
        );
    }

    #[test]
    fn test_extracted_keywords_join_curated_ones() {
        let record = ExperimentRecord::new("GLDS-7", "Plant study")
            .with_organism("Arabidopsis thaliana")
            .with_description("Microgravity altered gene expression.")
            .with_factors(["Spaceflight"]);
        let extracted = ["microgravity altered", "gene expression", "microgravity", "Spaceflight"];

        let labels: Vec<String> = normalize_with_keywords(&record, extracted)
            .iter()
            .map(|e| e.id())
            .collect();
        assert_eq!(
            labels,
            vec![
                "organism:arabidopsis-thaliana",
                "condition:microgravity",
                "condition:spaceflight",
                "process:gene-expression",
            ]
        );
    }

    #[test]
    fn test_empty_record_has_no_entities() {
        let record = ExperimentRecord::new("X", "Untitled").with_keywords(["nothing relevant"]);
        assert!(normalize_record(&record).is_empty());
    }

    #[test]
    fn test_kind_strings_round_trip() {
        for kind in EntityKind::iter() {
            assert_eq!(EntityKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert_eq!(serde_json::to_string(&EntityKind::Outcome).unwrap(), "\"outcome\"");
    }
}
