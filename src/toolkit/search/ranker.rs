use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::cache::{CacheStats, QueryCache};
use crate::core::config::NullspaceConfig;
use crate::core::records::ExperimentRecord;
use crate::toolkit::entity::{EntityKind, NormalizedEntity};
use crate::toolkit::index::{SimilarityIndex, cosine_similarity};
use crate::utils::{is_stopword, normalize_label, safe_truncate, tokenize};

/// Salience given to curated keywords from the data source.
const CURATED_SALIENCE: f64 = 1.0;


#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub lexical: f64,
    pub keyword: f64,
    pub embedding: f64,
}

impl SignalScores {
    pub fn is_zero(&self) -> bool {
        self.lexical == 0.0 && self.keyword == 0.0 && self.embedding == 0.0
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub experiment_id: String,
    pub score: f64,
    pub signals: SignalScores,
}

/// Combines lexical containment, keyword salience and embedding similarity
/// into one relevance order.
pub struct SearchRanker {
    lexical_weight: f64,
    keyword_weight: f64,
    embedding_weight: f64,
    min_embedding_similarity: f64,
    query_cache: QueryCache<Vec<f32>>,
}

/// Normalized, deduplicated query tokens. Stopwords are dropped unless the
/// query has nothing else.
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let tokens: Vec<String> = tokenize(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();

    let content: Vec<String> = tokens.iter().filter(|t| !is_stopword(t)).cloned().collect();
    if content.is_empty() { tokens } else { content }
}

fn record_vocabulary(record: &ExperimentRecord, index: &SimilarityIndex) -> HashSet<String> {
    let mut fields: Vec<String> = vec![
        record.title.clone(),
        record.organism.clone(),
        record.mission.clone(),
    ];
    if let Some(organism) = NormalizedEntity::new(EntityKind::Organism, &record.organism) {
        fields.push(organism.label);
    }
    fields.extend(record.keywords.iter().cloned());
    if let Some(entry) = index.get(&record.id) {
        fields.extend(entry.keywords.iter().map(|k| k.keyword.clone()));
    }

    fields.iter().flat_map(|f| tokenize(f)).collect()
}

fn keyword_signal(tokens: &[String], record: &ExperimentRecord, index: &SimilarityIndex) -> f64 {
    let mut scored: Vec<(HashSet<String>, f64)> = record
        .keywords
        .iter()
        .map(|k| (tokenize(k).into_iter().collect(), CURATED_SALIENCE))
        .collect();
    if let Some(entry) = index.get(&record.id) {
        scored.extend(
            entry
                .keywords
                .iter()
                .map(|k| (tokenize(&k.keyword).into_iter().collect(), f64::from(k.salience))),
        );
    }
    if scored.is_empty() || tokens.is_empty() {
        return 0.0;
    }

    let total: f64 = tokens
        .iter()
        .map(|token| {
            scored
                .iter()
                .filter(|(words, _)| words.contains(token))
                .map(|(_, salience)| *salience)
                .fold(0.0, f64::max)
        })
        .sum();

    (total / tokens.len() as f64).clamp(0.0, 1.0)
}

impl SearchRanker {

    pub fn new(
        lexical_weight: f64,
        keyword_weight: f64,
        embedding_weight: f64,
        min_embedding_similarity: f64,
        cache_size: usize,
    ) -> Self {
        let sum = lexical_weight + keyword_weight + embedding_weight;
        let (l, k, e) = if sum > 0.0 {
            (lexical_weight / sum, keyword_weight / sum, embedding_weight / sum)
        } else {
            (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
        };

        Self {
            lexical_weight: l,
            keyword_weight: k,
            embedding_weight: e,
            min_embedding_similarity,
            query_cache: QueryCache::new(cache_size),
        }
    }


    pub fn from_config(config: &NullspaceConfig) -> Self {
        Self::new(
            config.lexical_weight,
            config.keyword_weight,
            config.embedding_weight,
            config.min_embedding_similarity,
            config.query_cache_size,
        )
    }

    async fn query_vector(&self, query: &str, index: &SimilarityIndex) -> Option<Vec<f32>> {
        let key = QueryCache::<Vec<f32>>::make_key(query, index.model_name());
        if let Some(vector) = self.query_cache.get(&key) {
            debug!("Query embedding cache HIT for '{}'", safe_truncate(query, 40));
            return Some(vector);
        }

        match index.embed(query).await {
            Ok(vector) => {
                self.query_cache.set(&key, vector.clone());
                Some(vector)
            }
            Err(e) => {
                warn!("Query embedding failed ({}), ranking without embedding signal", e);
                None
            }
        }
    }

    /// Ranks `records` against `query`, best first.
    ///
    /// An empty query returns every record in its original order with a zero
    /// score and no scoring work. Records with no signal at all are left out.
    pub async fn rank(
        &self,
        query: &str,
        records: &[ExperimentRecord],
        index: &SimilarityIndex,
    ) -> Vec<RankedResult> {
        let normalized = normalize_label(query);
        if normalized.is_empty() {
            return records
                .iter()
                .map(|r| RankedResult {
                    experiment_id: r.id.clone(),
                    score: 0.0,
                    signals: SignalScores::default(),
                })
                .collect();
        }

        let tokens = query_tokens(&normalized);
        let query_vector = self.query_vector(&normalized, index).await;

        let mut results: Vec<RankedResult> = records
            .iter()
            .filter_map(|record| {
                let signals = self.score(&tokens, query_vector.as_deref(), record, index);
                if signals.is_zero() {
                    return None;
                }
                Some(RankedResult {
                    experiment_id: record.id.clone(),
                    score: self.combine(&signals),
                    signals,
                })
            })
            .collect();

        // Stable: exact ties keep record order.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!(
            "Ranked '{}': {} of {} records matched",
            safe_truncate(query, 40),
            results.len(),
            records.len()
        );
        results
    }

    fn score(
        &self,
        tokens: &[String],
        query_vector: Option<&[f32]>,
        record: &ExperimentRecord,
        index: &SimilarityIndex,
    ) -> SignalScores {
        let vocabulary = record_vocabulary(record, index);
        let matched = tokens.iter().filter(|t| vocabulary.contains(*t)).count();
        let lexical = if tokens.is_empty() {
            0.0
        } else {
            matched as f64 / tokens.len() as f64
        };

        let keyword = keyword_signal(tokens, record, index);

        let embedding = match (query_vector, index.get(&record.id)) {
            (Some(q), Some(entry)) => {
                let similarity = f64::from(cosine_similarity(q, &entry.vector));
                if similarity >= self.min_embedding_similarity {
                    similarity.clamp(0.0, 1.0)
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        SignalScores {
            lexical,
            keyword,
            embedding,
        }
    }

    fn combine(&self, signals: &SignalScores) -> f64 {
        self.lexical_weight * signals.lexical
            + self.keyword_weight * signals.keyword
            + self.embedding_weight * signals.embedding
    }


    pub fn cache_stats(&self) -> CacheStats {
        self.query_cache.stats()
    }
}
