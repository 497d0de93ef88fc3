//! Deterministic in-process models used when no inference server is configured.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::base::{EmbeddingModel, InferenceError, SummaryBounds, SummaryModel};
use crate::utils::{cap_words, is_stopword, tokenize, word_count};

const BIGRAM_WEIGHT: f32 = 0.5;

/// Signed feature hashing over content-word unigrams and bigrams.
///
/// Vectors are stable across processes and platforms: bucket and sign come
/// from a SHA-256 digest of the feature string.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {

    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
            % self.dimensions;
        let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }


    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|t| !is_stopword(t))
            .collect();

        for token in &tokens {
            self.accumulate(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, &bigram, BIGRAM_WEIGHT);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingModel for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        if text.trim().is_empty() {
            return Err(InferenceError::EmptyText);
        }
        Ok(self.embed_sync(text))
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }
}

/// Extractive summarizer: keeps the leading sentences of the input.
pub struct LeadSentenceSummarizer {
    max_sentences: usize,
}

impl LeadSentenceSummarizer {

    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }
}

impl Default for LeadSentenceSummarizer {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Splits on `.`, `!` or `?` followed by whitespace or end of text.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                let end = idx + ch.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

#[async_trait]
impl SummaryModel for LeadSentenceSummarizer {
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, InferenceError> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Err(InferenceError::EmptyText);
        }

        let mut picked: Vec<&str> = Vec::new();
        for sentence in sentences {
            if picked.len() >= self.max_sentences {
                break;
            }
            if picked.len() >= 2 && word_count(&picked.join(" ")) >= bounds.min_tokens {
                break;
            }
            picked.push(sentence);
        }

        Ok(cap_words(&picked.join(" "), bounds.max_tokens))
    }

    fn model_name(&self) -> &str {
        "lead-sentences"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_is_deterministic() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_sync("Muscle atrophy in microgravity");
        let b = embedder.embed_sync("muscle ATROPHY in microgravity!");
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hashing_ignores_stopwords() {
        let embedder = HashingEmbedder::new(64);
        assert_eq!(embedder.embed_sync("the of and"), vec![0.0; 64]);
    }

    #[test]
    fn test_empty_text_is_an_error() {
        let embedder = HashingEmbedder::new(16);
        let result = tokio_test::block_on(embedder.embed("  "));
        assert!(matches!(result, Err(InferenceError::EmptyText)));
        tokio_test::assert_ok!(tokio_test::block_on(embedder.embed("radiation")));
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("First one. Second? Version 2.5 works! tail");
        assert_eq!(sentences, vec!["First one.", "Second?", "Version 2.5 works!", "tail"]);
    }

    #[tokio::test]
    async fn test_lead_sentences_respect_bounds() {
        let model = LeadSentenceSummarizer::default();
        let text = "One two three. Four five six. Seven eight nine. Ten eleven twelve.";

        let summary = model
            .summarize(text, SummaryBounds { min_tokens: 3, max_tokens: 50 })
            .await
            .unwrap();
        assert_eq!(summary, "One two three. Four five six.");

        let capped = model
            .summarize(text, SummaryBounds { min_tokens: 100, max_tokens: 4 })
            .await
            .unwrap();
        assert_eq!(capped, "One two three. Four");
    }
}
