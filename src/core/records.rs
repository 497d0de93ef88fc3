use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{NullspaceError, Result};

/// One experiment as delivered by the data-loading side. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentRecord {
    pub id: String,
    pub title: String,
    pub organism: String,
    pub mission: String,
    pub description: String,
    pub duration: Option<String>,
    pub publication_count: u32,
    pub dataset_size: Option<String>,
    pub keywords: Vec<String>,
    pub factors: Vec<String>,
    pub data_types: Vec<String>,
}

impl ExperimentRecord {

    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }


    pub fn with_organism(mut self, organism: impl Into<String>) -> Self {
        self.organism = organism.into();
        self
    }


    pub fn with_mission(mut self, mission: impl Into<String>) -> Self {
        self.mission = mission.into();
        self
    }


    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }


    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }


    pub fn with_factors<I, S>(mut self, factors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.factors = factors.into_iter().map(Into::into).collect();
        self
    }

    /// The description, or the title when no description is present.
    pub fn verbatim_text(&self) -> &str {
        if self.description.trim().is_empty() {
            self.title.trim()
        } else {
            self.description.trim()
        }
    }


    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(NullspaceError::malformed(
                display_id(&self.id, &self.title),
                "missing id",
            ));
        }
        if self.title.trim().is_empty() {
            return Err(NullspaceError::malformed(&self.id, "missing title"));
        }
        Ok(())
    }
}

fn display_id(id: &str, title: &str) -> String {
    if id.trim().is_empty() {
        format!("<unnamed: {}>", crate::safe_truncate_ellipsis(title.trim(), 40))
    } else {
        id.to_string()
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub id: String,
    pub position: usize,
    pub reason: String,
}

impl RejectedRecord {
    fn describe(&self) -> String {
        format!("record #{} ({}): {}", self.position, self.id, self.reason)
    }
}

/// Splits a collection into accepted records (original order kept) and
/// rejections. Later duplicates of an already accepted id are rejected.
pub fn partition_records(records: Vec<ExperimentRecord>) -> (Vec<ExperimentRecord>, Vec<RejectedRecord>) {
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for (position, record) in records.into_iter().enumerate() {
        let verdict = record.validate().and_then(|_| {
            if seen.contains(&record.id) {
                Err(NullspaceError::malformed(&record.id, "duplicate id"))
            } else {
                Ok(())
            }
        });

        match verdict {
            Ok(()) => {
                seen.insert(record.id.clone());
                accepted.push(record);
            }
            Err(NullspaceError::InputMalformed { id, reason }) => {
                warn!("Rejecting record #{} ({}): {}", position, id, reason);
                rejected.push(RejectedRecord { id, position, reason });
            }
            Err(other) => {
                warn!("Rejecting record #{}: {}", position, other);
                rejected.push(RejectedRecord {
                    id: record.id.clone(),
                    position,
                    reason: other.to_string(),
                });
            }
        }
    }

    (accepted, rejected)
}


pub fn rejection_causes(rejected: &[RejectedRecord]) -> Vec<String> {
    rejected.iter().map(RejectedRecord::describe).collect()
}

/// Reads a JSON array of records, e.g. a cache file written by the data loader.
pub fn load_records(path: &Path) -> Result<Vec<ExperimentRecord>> {
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<ExperimentRecord> = serde_json::from_str(&raw)?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_verbatim_falls_back_to_title() {
        let record = ExperimentRecord::new("GLDS-1", "Plant growth");
        assert_eq!(record.verbatim_text(), "Plant growth");

        let record = record.with_description("  Roots grew sideways.  ");
        assert_eq!(record.verbatim_text(), "Roots grew sideways.");
    }

    #[test]
    fn test_validate_missing_fields() {
        let missing_id = ExperimentRecord::new(" ", "Title");
        assert!(matches!(
            missing_id.validate(),
            Err(NullspaceError::InputMalformed { ref reason, .. }) if reason == "missing id"
        ));

        let missing_title = ExperimentRecord::new("GLDS-2", "");
        match missing_title.validate() {
            Err(NullspaceError::InputMalformed { id, reason }) => {
                assert_eq!(id, "GLDS-2");
                assert_eq!(reason, "missing title");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_partition_keeps_order_and_rejects_duplicates() {
        let records = vec![
            ExperimentRecord::new("A", "first"),
            ExperimentRecord::new("B", ""),
            ExperimentRecord::new("C", "third"),
            ExperimentRecord::new("A", "again"),
        ];

        let (accepted, rejected) = partition_records(records);
        let ids: Vec<_> = accepted.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].position, 1);
        assert_eq!(rejected[1].reason, "duplicate id");
    }

    #[test]
    fn test_load_records_accepts_partial_objects() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "GLDS-21", "title": "Arabidopsis", "keywords": ["microgravity"]}}, {{"title": "no id"}}]"#
        )
        .unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].keywords, vec!["microgravity"]);
        assert!(records[1].id.is_empty());
    }
}
