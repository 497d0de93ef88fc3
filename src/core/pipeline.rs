use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::NullspaceConfig;
use super::error::{NullspaceError, Result};
use super::records::{ExperimentRecord, RejectedRecord, partition_records, rejection_causes};
use crate::llm::factory::ModelFactory;
use crate::llm::providers::base::{EmbeddingModel, SummaryModel};
use crate::llm::summarizer::{ExperimentSummarizer, Summary, SummarySource};
use crate::toolkit::entity::vocabulary::vocabulary_size;
use crate::toolkit::entity::{EntityKind, NormalizedEntity, normalize_with_keywords};
use crate::toolkit::graph::{GraphBuilder, KnowledgeGraph};
use crate::toolkit::index::{Neighbor, SimilarityIndex};
use crate::toolkit::keywords::{KeywordExtractor, ScoredKeyword};
use crate::toolkit::search::{RankedResult, SearchRanker};
use crate::utils::normalize_label;

/// One consistent build: readers hold an `Arc` and never see a partial rebuild.
pub struct Snapshot {
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    pub records: Vec<ExperimentRecord>,
    pub index: SimilarityIndex,
    pub graph: Arc<KnowledgeGraph>,
    pub summaries: HashMap<String, Summary>,
    pub rejected: Vec<RejectedRecord>,
}

impl Snapshot {
    pub fn record(&self, id: &str) -> Option<&ExperimentRecord> {
        self.index.position(id).map(|pos| &self.records[pos])
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub generation: u64,
    pub accepted: usize,
    pub rejected: Vec<RejectedRecord>,
    pub nodes: usize,
    pub edges: usize,
    pub summary_fallbacks: usize,
    pub embedding_failures: usize,
    pub duration_ms: u64,
    /// A newer build was already live when this one finished, so it was dropped.
    pub superseded: bool,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDetails {
    pub record: ExperimentRecord,
    pub summary: Summary,
    pub keywords: Vec<ScoredKeyword>,
    pub entities: Vec<NormalizedEntity>,
    pub related: Vec<Neighbor>,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_experiments: usize,
    pub organisms_studied: usize,
    pub missions_covered: usize,
    pub keywords_indexed: usize,
    pub rejected_records: usize,
    pub generation: u64,
    pub last_updated: DateTime<Utc>,
}

struct RecordAnalysis {
    summary: Summary,
    keywords: Vec<ScoredKeyword>,
    vector: Option<Vec<f32>>,
    text: String,
}

/// Title, summary, organism, mission and curated keywords joined as one text.
fn canonical_text(record: &ExperimentRecord, summary: &Summary) -> String {
    let keywords = record.keywords.join(", ");
    [
        record.title.trim(),
        summary.text.trim(),
        record.organism.trim(),
        record.mission.trim(),
        keywords.as_str(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(". ")
}

fn keyword_text(record: &ExperimentRecord, summary: &Summary) -> String {
    let description = record.description.trim();
    let summary = summary.text.trim();
    if description.is_empty() || description == summary {
        summary.to_string()
    } else {
        format!("{summary} {description}")
    }
}

/// Owns the models and the current snapshot.
pub struct ExperimentPipeline {
    config: NullspaceConfig,
    summarizer: ExperimentSummarizer,
    keywords: KeywordExtractor,
    embedder: Arc<dyn EmbeddingModel>,
    ranker: SearchRanker,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    generation: AtomicU64,
}

impl ExperimentPipeline {

    pub fn new(
        config: NullspaceConfig,
        summary_model: Arc<dyn SummaryModel>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        let summarizer = ModelFactory::summarizer(&config, summary_model);
        let keywords = KeywordExtractor::new(
            embedder.clone(),
            config.keyword_limit,
            config.keyword_max_ngram,
        );
        let ranker = SearchRanker::from_config(&config);

        info!(
            "ExperimentPipeline initialized: summary_model={}, embedding_model={}, vocabulary={} terms",
            summarizer.model_name(),
            embedder.model_name(),
            vocabulary_size()
        );

        Self {
            config,
            summarizer,
            keywords,
            embedder,
            ranker,
            snapshot: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Validates the config and builds both models through [`ModelFactory`].
    pub fn from_config(config: NullspaceConfig) -> Result<Self> {
        config.validate()?;
        let summary_model = ModelFactory::summary_model(&config)?;
        let embedder = ModelFactory::embedding_model(&config)?;
        Ok(Self::new(config, summary_model, embedder))
    }


    pub fn config(&self) -> &NullspaceConfig {
        &self.config
    }


    pub fn summarizer(&self) -> &ExperimentSummarizer {
        &self.summarizer
    }


    pub fn ranker(&self) -> &SearchRanker {
        &self.ranker
    }

    async fn analyze(&self, record: &ExperimentRecord, index: &SimilarityIndex) -> RecordAnalysis {
        let summary = self.summarizer.summarize(record).await;
        let keywords = self
            .keywords
            .extract_for(&record.id, &keyword_text(record, &summary))
            .await;

        let text = canonical_text(record, &summary);
        let vector = match index.embed(&text).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Embedding failed for {}: {}", record.id, e);
                None
            }
        };

        RecordAnalysis {
            summary,
            keywords,
            vector,
            text,
        }
    }

    /// Rebuilds index and graph from the full collection and swaps them in.
    ///
    /// Malformed records are rejected individually. The build fails only when
    /// the collection is empty or nothing survives validation; the previous
    /// snapshot stays in place in that case. Generations are reserved when
    /// analysis starts; a build that finishes after a newer one went live is
    /// reported as superseded and dropped.
    pub async fn build(&self, records: Vec<ExperimentRecord>) -> Result<BuildReport> {
        let started = Instant::now();
        if records.is_empty() {
            return Err(NullspaceError::build_failed(vec![
                "record collection is empty".to_string(),
            ]));
        }

        let total = records.len();
        let (accepted, rejected) = partition_records(records);
        if accepted.is_empty() {
            return Err(NullspaceError::build_failed(rejection_causes(&rejected)));
        }
        info!(
            "Building index: {} records ({} accepted, {} rejected)",
            total,
            accepted.len(),
            rejected.len()
        );

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut index = SimilarityIndex::new(self.embedder.clone());

        // Per-record inference is independent; results come back in record order.
        let analyses: Vec<RecordAnalysis> = stream::iter(accepted.iter())
            .map(|record| self.analyze(record, &index))
            .buffered(self.config.build_concurrency.max(1))
            .collect()
            .await;

        let dimensions = analyses
            .iter()
            .find_map(|a| a.vector.as_ref().map(Vec::len))
            .unwrap_or(self.config.embedding_dimensions);

        let mut summaries = HashMap::with_capacity(accepted.len());
        let mut graph = GraphBuilder::new();
        let mut summary_fallbacks = 0;
        let mut embedding_failures = 0;

        for (record, analysis) in accepted.iter().zip(analyses) {
            if analysis.summary.source == SummarySource::Fallback {
                summary_fallbacks += 1;
            }
            let vector = match analysis.vector {
                Some(v) if v.len() == dimensions => v,
                _ => {
                    embedding_failures += 1;
                    vec![0.0; dimensions]
                }
            };
            let entities = normalize_with_keywords(
                record,
                analysis.keywords.iter().map(|k| k.keyword.as_str()),
            );
            graph.add_entities(&record.id, &entities);
            index.add(
                &record.id,
                vector,
                analysis.keywords,
                normalize_label(&analysis.text),
            )?;
            summaries.insert(record.id.clone(), analysis.summary);
        }

        let graph = graph.finish();
        let live: HashSet<String> = accepted.iter().map(|r| r.id.clone()).collect();

        let mut report = BuildReport {
            generation,
            accepted: accepted.len(),
            rejected: rejected.clone(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            summary_fallbacks,
            embedding_failures,
            duration_ms: started.elapsed().as_millis() as u64,
            superseded: false,
        };

        let snapshot = Arc::new(Snapshot {
            generation,
            built_at: Utc::now(),
            records: accepted,
            index,
            graph: Arc::new(graph),
            summaries,
            rejected,
        });

        {
            let mut current = self.snapshot.write();
            if current.as_ref().is_none_or(|s| s.generation < generation) {
                *current = Some(snapshot);
            } else {
                report.superseded = true;
            }
        }

        if report.superseded {
            warn!("Discarding build {} superseded by a newer snapshot", generation);
            return Ok(report);
        }

        let live: HashSet<&str> = live.iter().map(String::as_str).collect();
        let evicted = self.summarizer.memo().retain_ids(&live) + self.keywords.memo().retain_ids(&live);
        if evicted > 0 {
            debug!("Evicted {} memo entries for records no longer loaded", evicted);
        }

        info!(
            "Build {} complete: {} records, {} nodes, {} edges, {} summary fallbacks, {}ms",
            report.generation,
            report.accepted,
            report.nodes,
            report.edges,
            report.summary_fallbacks,
            report.duration_ms
        );
        Ok(report)
    }

    /// Current snapshot, or `IndexNotBuilt` before the first successful build.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.snapshot.read().clone().ok_or(NullspaceError::IndexNotBuilt)
    }


    pub fn is_ready(&self) -> bool {
        self.snapshot.read().is_some()
    }


    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<RankedResult>> {
        let snapshot = self.snapshot()?;
        let mut results = self.ranker.rank(query, &snapshot.records, &snapshot.index).await;
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    /// Ranks only records whose organism normalizes to the same entity as
    /// `organism`. A blank filter searches everything.
    pub async fn search_filtered(
        &self,
        query: &str,
        organism: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RankedResult>> {
        let Some(filter) = NormalizedEntity::new(EntityKind::Organism, organism) else {
            return self.search(query, limit).await;
        };

        let snapshot = self.snapshot()?;
        let subset: Vec<ExperimentRecord> = snapshot
            .records
            .iter()
            .filter(|r| {
                NormalizedEntity::new(EntityKind::Organism, &r.organism).as_ref() == Some(&filter)
            })
            .cloned()
            .collect();

        let mut results = self.ranker.rank(query, &subset, &snapshot.index).await;
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        Ok(results)
    }


    pub fn graph(&self) -> Result<Arc<KnowledgeGraph>> {
        Ok(self.snapshot()?.graph.clone())
    }

    /// Nearest records to `id`, excluding `id` itself.
    pub fn related(&self, id: &str, k: Option<usize>) -> Result<Vec<Neighbor>> {
        let snapshot = self.snapshot()?;
        snapshot
            .index
            .related(id, k.unwrap_or(self.config.related_k))
            .ok_or_else(|| NullspaceError::ExperimentNotFound(id.to_string()))
    }


    pub fn details(&self, id: &str) -> Result<ExperimentDetails> {
        let snapshot = self.snapshot()?;
        let record = snapshot
            .record(id)
            .ok_or_else(|| NullspaceError::ExperimentNotFound(id.to_string()))?;

        let summary = snapshot.summaries.get(id).cloned().unwrap_or_else(|| Summary {
            text: record.verbatim_text().to_string(),
            source: SummarySource::Fallback,
        });
        let keywords = snapshot
            .index
            .get(id)
            .map(|e| e.keywords.clone())
            .unwrap_or_default();
        let entities = normalize_with_keywords(record, keywords.iter().map(|k| k.keyword.as_str()));
        let related = snapshot
            .index
            .related(id, self.config.related_k)
            .unwrap_or_default();

        Ok(ExperimentDetails {
            record: record.clone(),
            summary,
            keywords,
            entities: entities.into_iter().collect(),
            related,
        })
    }


    pub fn stats(&self) -> Result<PlatformStats> {
        let snapshot = self.snapshot()?;

        let mut keywords: BTreeSet<String> = snapshot
            .records
            .iter()
            .flat_map(|r| r.keywords.iter().map(|k| normalize_label(k)))
            .filter(|k| !k.is_empty())
            .collect();
        keywords.extend(
            snapshot
                .index
                .entries()
                .iter()
                .flat_map(|e| e.keywords.iter().map(|k| k.keyword.clone())),
        );

        Ok(PlatformStats {
            total_experiments: snapshot.records.len(),
            organisms_studied: snapshot.graph.nodes_of_kind(EntityKind::Organism).count(),
            missions_covered: snapshot.graph.nodes_of_kind(EntityKind::Mission).count(),
            keywords_indexed: keywords.len(),
            rejected_records: snapshot.rejected.len(),
            generation: snapshot.generation,
            last_updated: snapshot.built_at,
        })
    }


    pub fn generation(&self) -> u64 {
        self.snapshot.read().as_ref().map_or(0, |s| s.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::local::{HashingEmbedder, LeadSentenceSummarizer};

    fn pipeline() -> ExperimentPipeline {
        ExperimentPipeline::new(
            NullspaceConfig::default(),
            Arc::new(LeadSentenceSummarizer::default()),
            Arc::new(HashingEmbedder::new(64)),
        )
    }

    #[test]
    fn test_canonical_text_skips_blank_parts() {
        let record = ExperimentRecord::new("A", "Roots")
            .with_organism("Arabidopsis thaliana")
            .with_keywords(["gravitropism", "root growth"]);
        let summary = Summary {
            text: "Roots".to_string(),
            source: SummarySource::TooShort,
        };
        assert_eq!(
            canonical_text(&record, &summary),
            "Roots. Roots. Arabidopsis thaliana. gravitropism, root growth"
        );
    }

    #[test]
    fn test_keyword_text_deduplicates() {
        let record = ExperimentRecord::new("A", "T").with_description("Same text.");
        let summary = Summary {
            text: "Same text.".to_string(),
            source: SummarySource::TooShort,
        };
        assert_eq!(keyword_text(&record, &summary), "Same text.");
    }

    #[tokio::test]
    async fn test_reads_before_build_are_not_ready() {
        let pipeline = pipeline();
        assert!(!pipeline.is_ready());
        assert!(matches!(pipeline.search("x", None).await, Err(NullspaceError::IndexNotBuilt)));
        assert!(matches!(pipeline.related("A", None), Err(NullspaceError::IndexNotBuilt)));
        assert!(matches!(pipeline.graph(), Err(NullspaceError::IndexNotBuilt)));
        assert!(matches!(pipeline.stats(), Err(NullspaceError::IndexNotBuilt)));
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_snapshot() {
        let pipeline = pipeline();
        pipeline
            .build(vec![ExperimentRecord::new("A", "Bone loss in mice")])
            .await
            .unwrap();

        let err = pipeline
            .build(vec![ExperimentRecord::new("", "no id")])
            .await
            .unwrap_err();
        assert!(matches!(err, NullspaceError::BuildFailed { .. }));
        assert_eq!(pipeline.generation(), 1);
        assert_eq!(pipeline.stats().unwrap().total_experiments, 1);
    }

    #[tokio::test]
    async fn test_rebuild_evicts_stale_memo_entries() {
        let pipeline = pipeline();
        pipeline
            .build(vec![
                ExperimentRecord::new("A", "Bone loss in mice"),
                ExperimentRecord::new("B", "Roots in orbit"),
            ])
            .await
            .unwrap();
        assert_eq!(pipeline.summarizer().cache_stats().size, 2);

        pipeline
            .build(vec![ExperimentRecord::new("A", "Bone loss in mice")])
            .await
            .unwrap();
        assert_eq!(pipeline.summarizer().cache_stats().size, 1);
        assert_eq!(pipeline.generation(), 2);
    }
}
