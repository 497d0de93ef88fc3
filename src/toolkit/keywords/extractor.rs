use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::cache::{MemoStats, RecordMemo};
use crate::llm::providers::base::{EmbeddingModel, InferenceError};
use crate::toolkit::index::cosine_similarity;
use crate::utils::{is_stopword, tokenize};

const MAX_CANDIDATES: usize = 128;
const MIN_TOKEN_CHARS: usize = 3;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    pub salience: f32,
}

/// Candidate n-grams ranked by similarity to the whole document embedding.
pub struct KeywordExtractor {
    embedder: Arc<dyn EmbeddingModel>,
    limit: usize,
    max_ngram: usize,
    memo: RecordMemo<Vec<ScoredKeyword>>,
}

fn is_content_token(token: &str) -> bool {
    token.chars().count() >= MIN_TOKEN_CHARS
        && !is_stopword(token)
        && !token.chars().all(|c| c.is_ascii_digit())
}

/// Unigrams through `max_ngram`-grams of consecutive content tokens, in order of
/// first occurrence.
pub fn candidates(text: &str, max_ngram: usize) -> Vec<String> {
    let tokens = tokenize(text);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for start in 0..tokens.len() {
        for n in 1..=max_ngram.max(1) {
            let end = start + n;
            if end > tokens.len() {
                break;
            }
            let window = &tokens[start..end];
            if !window.iter().all(|t| is_content_token(t)) {
                break;
            }
            let phrase = window.join(" ");
            if seen.insert(phrase.clone()) {
                out.push(phrase);
            }
        }
    }

    out
}

fn term_frequency(text: &str, candidates: &[String]) -> Vec<f32> {
    let tokens = tokenize(text);
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for candidate in candidates {
        let n = candidate.split(' ').count();
        let occurrences = tokens
            .windows(n)
            .filter(|w| w.join(" ") == *candidate)
            .count();
        counts.insert(candidate.as_str(), occurrences);
    }

    let max = counts.values().copied().max().unwrap_or(0).max(1) as f32;
    candidates
        .iter()
        .map(|c| counts.get(c.as_str()).copied().unwrap_or(0) as f32 / max)
        .collect()
}

impl KeywordExtractor {

    pub fn new(embedder: Arc<dyn EmbeddingModel>, limit: usize, max_ngram: usize) -> Self {
        Self {
            embedder,
            limit: limit.max(1),
            max_ngram: max_ngram.max(1),
            memo: RecordMemo::new(),
        }
    }

    async fn embedding_salience(
        &self,
        text: &str,
        candidates: &[String],
    ) -> Result<Vec<f32>, InferenceError> {
        let document = self.embedder.embed(text).await?;
        let vectors = self.embedder.embed_batch(candidates).await?;
        Ok(vectors
            .iter()
            .map(|v| cosine_similarity(&document, v).clamp(0.0, 1.0))
            .collect())
    }

    async fn score(&self, text: &str) -> (Vec<ScoredKeyword>, bool) {
        let mut candidates = candidates(text, self.max_ngram);
        candidates.truncate(MAX_CANDIDATES);
        if candidates.is_empty() {
            return (Vec::new(), false);
        }

        let (saliences, degraded) = match self.embedding_salience(text, &candidates).await {
            Ok(s) => (s, false),
            Err(e) => {
                warn!("Keyword embedding failed ({}), using term frequency", e);
                (term_frequency(text, &candidates), true)
            }
        };

        let mut scored: Vec<ScoredKeyword> = candidates
            .into_iter()
            .zip(saliences)
            .map(|(keyword, salience)| ScoredKeyword { keyword, salience })
            .collect();
        scored.sort_by(|a, b| b.salience.total_cmp(&a.salience));
        scored.truncate(self.limit);
        (scored, degraded)
    }

    /// Top keywords with salience in [0, 1], highest first. Ties keep the
    /// order of first occurrence in the text.
    pub async fn extract(&self, text: &str) -> Vec<ScoredKeyword> {
        self.score(text).await.0
    }

    /// Memoized by record id and text digest. Degraded results are not kept.
    pub async fn extract_for(&self, record_id: &str, text: &str) -> Vec<ScoredKeyword> {
        let digest = RecordMemo::<Vec<ScoredKeyword>>::digest(text);
        if let Some(cached) = self.memo.get(record_id, &digest) {
            return cached;
        }

        let (keywords, degraded) = self.score(text).await;
        debug!("Extracted {} keywords for {}", keywords.len(), record_id);
        if !degraded {
            self.memo.set(record_id, digest, keywords.clone());
        }
        keywords
    }


    pub fn memo(&self) -> &RecordMemo<Vec<ScoredKeyword>> {
        &self.memo
    }


    pub fn cache_stats(&self) -> MemoStats {
        self.memo.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::local::HashingEmbedder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingModel for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct OfflineEmbedder;

    #[async_trait]
    impl EmbeddingModel for OfflineEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, InferenceError> {
            Err(InferenceError::InvalidResponse("offline".to_string()))
        }

        fn model_name(&self) -> &str {
            "offline"
        }
    }

    #[test]
    fn test_candidates_skip_stopwords() {
        assert_eq!(
            candidates("The microgravity effects on gene expression", 2),
            vec![
                "microgravity",
                "microgravity effects",
                "effects",
                "gene",
                "gene expression",
                "expression",
            ]
        );
        assert!(candidates("of the and 2024", 2).is_empty());
    }

    #[tokio::test]
    async fn test_extract_is_bounded_and_sorted() {
        let extractor = KeywordExtractor::new(Arc::new(HashingEmbedder::new(256)), 5, 2);
        let keywords = extractor
            .extract(
                "Microgravity alters gene expression in Arabidopsis roots. \
                 Gene expression changes in roots were broad and persistent.",
            )
            .await;

        assert!(!keywords.is_empty());
        assert!(keywords.len() <= 5);
        assert!(keywords.iter().all(|k| (0.0..=1.0).contains(&k.salience)));
        assert!(keywords.windows(2).all(|w| w[0].salience >= w[1].salience));
    }

    #[tokio::test]
    async fn test_empty_text_yields_nothing() {
        let extractor = KeywordExtractor::new(Arc::new(HashingEmbedder::new(16)), 10, 2);
        assert!(extractor.extract("   ").await.is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_term_frequency() {
        let extractor = KeywordExtractor::new(Arc::new(OfflineEmbedder), 3, 2);
        let keywords = extractor.extract_for("X", "bone loss bone loss muscle").await;

        assert_eq!(keywords.len(), 3);
        assert_eq!(keywords[0].keyword, "bone");
        assert!((keywords[0].salience - 1.0).abs() < f32::EPSILON);
        assert_eq!(extractor.cache_stats().size, 0);
    }

    #[tokio::test]
    async fn test_extract_for_memoizes() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let extractor = KeywordExtractor::new(embedder.clone(), 10, 1);
        let first = extractor.extract_for("A", "radiation damage").await;
        let calls = embedder.calls.load(Ordering::SeqCst);
        let second = extractor.extract_for("A", "radiation damage").await;

        assert_eq!(first, second);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), calls);
        assert_eq!(extractor.cache_stats().hits, 1);
    }
}
