use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use text_splitter::TextSplitter;
use tracing::{debug, info, warn};

use super::providers::base::{InferenceError, SummaryBounds, SummaryModel};
use crate::core::cache::{MemoStats, RecordMemo};
use crate::core::records::ExperimentRecord;
use crate::utils::{cap_words, word_count};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    Model,
    /// Input was below the minimum token threshold.
    TooShort,
    /// Inference failed or timed out; the verbatim text was returned.
    Fallback,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub source: SummarySource,
}

impl Summary {

    pub fn is_verbatim(&self) -> bool {
        !matches!(self.source, SummarySource::Model)
    }
}

/// Wraps a summary model with input preparation, a timeout, verbatim fallback
/// and a per-record memo.
pub struct ExperimentSummarizer {
    model: Arc<dyn SummaryModel>,
    bounds: SummaryBounds,
    min_input_tokens: usize,
    timeout: Duration,
    splitter: TextSplitter<text_splitter::Characters>,
    memo: RecordMemo<Summary>,
    fallback_count: AtomicUsize,
}

impl ExperimentSummarizer {

    pub fn new(
        model: Arc<dyn SummaryModel>,
        bounds: SummaryBounds,
        min_input_tokens: usize,
        max_input_chars: usize,
        timeout: Duration,
    ) -> Self {
        info!(
            "ExperimentSummarizer initialized: model={}, bounds={}..{} tokens, timeout={:?}",
            model.model_name(),
            bounds.min_tokens,
            bounds.max_tokens,
            timeout
        );

        Self {
            model,
            bounds,
            min_input_tokens,
            timeout,
            splitter: TextSplitter::new(max_input_chars.max(1)),
            memo: RecordMemo::new(),
            fallback_count: AtomicUsize::new(0),
        }
    }

    /// Builds the model input from the record's fields, bounded on a
    /// sentence or word boundary.
    pub fn prepare_input(&self, record: &ExperimentRecord) -> String {
        let mut parts = Vec::new();
        if !record.title.trim().is_empty() {
            parts.push(format!("Study: {}", record.title.trim().trim_end_matches('.')));
        }
        if !record.description.trim().is_empty() {
            parts.push(record.description.trim().trim_end_matches('.').to_string());
        }
        if !record.organism.trim().is_empty() {
            parts.push(format!("Organism studied: {}", record.organism.trim()));
        }
        if !record.mission.trim().is_empty() {
            parts.push(format!("Mission: {}", record.mission.trim()));
        }

        let text = parts.join(". ");
        let bounded = self.splitter.chunks(&text).next().map(str::to_string);
        bounded.unwrap_or(text)
    }

    /// Never fails: inference problems degrade to the verbatim description.
    pub async fn summarize(&self, record: &ExperimentRecord) -> Summary {
        let input = self.prepare_input(record);
        let digest = RecordMemo::<Summary>::digest(&input);

        if let Some(cached) = self.memo.get(&record.id, &digest) {
            return cached;
        }

        let verbatim = record.verbatim_text();
        if word_count(verbatim) < self.min_input_tokens {
            debug!(
                "Input too short for {} ({} tokens), keeping verbatim",
                record.id,
                word_count(verbatim)
            );
            let summary = Summary {
                text: verbatim.to_string(),
                source: SummarySource::TooShort,
            };
            self.memo.set(&record.id, digest, summary.clone());
            return summary;
        }

        match self.infer(&input).await {
            Ok(text) => {
                let summary = Summary {
                    text,
                    source: SummarySource::Model,
                };
                self.memo.set(&record.id, digest, summary.clone());
                summary
            }
            Err(e) => {
                self.fallback_count.fetch_add(1, Ordering::SeqCst);
                warn!(
                    "Summarization unavailable for {} ({}), using verbatim text (total_fallbacks={})",
                    record.id,
                    e,
                    self.fallback_count.load(Ordering::SeqCst)
                );
                // Not memoized: a later build retries the model.
                Summary {
                    text: verbatim.to_string(),
                    source: SummarySource::Fallback,
                }
            }
        }
    }

    async fn infer(&self, input: &str) -> Result<String, InferenceError> {
        let text = tokio::time::timeout(self.timeout, self.model.summarize(input, self.bounds))
            .await
            .map_err(|_| InferenceError::Timeout(self.timeout))??;

        let capped = cap_words(text.trim(), self.bounds.max_tokens);
        if capped.is_empty() {
            return Err(InferenceError::InvalidResponse("empty summary".to_string()));
        }
        Ok(capped)
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }


    pub fn memo(&self) -> &RecordMemo<Summary> {
        &self.memo
    }


    pub fn cache_stats(&self) -> MemoStats {
        self.memo.stats()
    }


    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SummaryModel for CountingModel {
        async fn summarize(&self, _text: &str, _bounds: SummaryBounds) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("Plants grown in orbit changed gene expression.".to_string())
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl SummaryModel for FailingModel {
        async fn summarize(&self, _text: &str, _bounds: SummaryBounds) -> Result<String, InferenceError> {
            Err(InferenceError::InvalidResponse("model offline".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    struct SlowModel;

    #[async_trait]
    impl SummaryModel for SlowModel {
        async fn summarize(&self, _text: &str, _bounds: SummaryBounds) -> Result<String, InferenceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    fn long_record() -> ExperimentRecord {
        ExperimentRecord::new("GLDS-21", "Spaceflight Effects on Arabidopsis Gene Expression")
            .with_organism("Arabidopsis thaliana")
            .with_description(
                "This study examines how the microgravity environment during spaceflight \
                 affects gene expression patterns in Arabidopsis thaliana plants. The research \
                 focuses on identifying genes that are differentially expressed under \
                 microgravity conditions compared to ground controls.",
            )
    }

    fn summarizer(model: Arc<dyn SummaryModel>, timeout: Duration) -> ExperimentSummarizer {
        ExperimentSummarizer::new(model, SummaryBounds::default(), 10, 1024, timeout)
    }

    #[tokio::test]
    async fn test_model_summary_is_memoized() {
        let model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
        });
        let summarizer = summarizer(model.clone(), Duration::from_secs(5));
        let record = long_record();

        let first = summarizer.summarize(&record).await;
        let second = summarizer.summarize(&record).await;

        assert_eq!(first.source, SummarySource::Model);
        assert_eq!(first, second);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summarizer.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_short_input_is_returned_verbatim() {
        let summarizer = summarizer(Arc::new(FailingModel), Duration::from_secs(5));
        let record = ExperimentRecord::new("GLDS-47", "Muscle Atrophy in Microgravity");

        let summary = summarizer.summarize(&record).await;
        assert_eq!(summary.text, "Muscle Atrophy in Microgravity");
        assert_eq!(summary.source, SummarySource::TooShort);
        assert_eq!(summarizer.fallback_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_description() {
        let summarizer = summarizer(Arc::new(FailingModel), Duration::from_secs(5));
        let record = long_record();

        let summary = summarizer.summarize(&record).await;
        assert_eq!(summary.source, SummarySource::Fallback);
        assert_eq!(summary.text, record.description.trim());
        assert_eq!(summarizer.fallback_count(), 1);
        assert_eq!(summarizer.cache_stats().size, 0);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_description() {
        let summarizer = summarizer(Arc::new(SlowModel), Duration::from_millis(20));
        let summary = summarizer.summarize(&long_record()).await;
        assert!(summary.is_verbatim());
        assert_eq!(summary.source, SummarySource::Fallback);
    }

    #[test]
    fn test_prepare_input_layout() {
        let summarizer = summarizer(Arc::new(FailingModel), Duration::from_secs(1));
        let record = ExperimentRecord::new("GLDS-1", "Root growth.")
            .with_description("Roots bend.")
            .with_organism("Brassica rapa")
            .with_mission("ISS Expedition-52");

        assert_eq!(
            summarizer.prepare_input(&record),
            "Study: Root growth. Roots bend. Organism studied: Brassica rapa. Mission: ISS Expedition-52"
        );
    }

    #[test]
    fn test_prepare_input_is_bounded() {
        let summarizer = ExperimentSummarizer::new(
            Arc::new(FailingModel),
            SummaryBounds::default(),
            10,
            64,
            Duration::from_secs(1),
        );
        let input = summarizer.prepare_input(&long_record());
        assert!(!input.is_empty());
        assert!(input.chars().count() <= 64);
        assert!(input.starts_with("Study: Spaceflight"));
    }
}
