use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::llm::providers::base::{EmbeddingModel, InferenceError};
use crate::toolkit::keywords::ScoredKeyword;


#[derive(Error, Debug, PartialEq)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate entry: {0}")]
    DuplicateId(String),

    #[error("Empty vector")]
    EmptyVector,
}

/// Cosine similarity in [-1, 1]; 0 for mismatched lengths or zero vectors.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}


pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub keywords: Vec<ScoredKeyword>,
    pub text: String,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: String,
    pub similarity: f32,
}

/// Nearest-neighbor lookup over stored vectors. The brute-force scan in
/// [`SimilarityIndex`] is one implementation; an approximate structure can sit
/// behind the same trait.
pub trait VectorSearch: Send + Sync {

    fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor>;


    fn len(&self) -> usize;


    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only collection of record embeddings.
pub struct SimilarityIndex {
    embedder: Arc<dyn EmbeddingModel>,
    dimensions: Option<usize>,
    entries: Vec<SearchIndexEntry>,
    positions: HashMap<String, usize>,
}

impl SimilarityIndex {

    pub fn new(embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            embedder,
            dimensions: None,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// L2-normalized embedding of `text`.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        let mut vector = self.embedder.embed(text).await?;
        if vector.is_empty() {
            return Err(InferenceError::InvalidResponse("empty embedding".to_string()));
        }
        if let Some(expected) = self.dimensions {
            if vector.len() != expected {
                return Err(InferenceError::InvalidResponse(format!(
                    "expected {} dimensions, got {}",
                    expected,
                    vector.len()
                )));
            }
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }


    pub fn add(
        &mut self,
        id: impl Into<String>,
        vector: Vec<f32>,
        keywords: Vec<ScoredKeyword>,
        text: impl Into<String>,
    ) -> Result<(), IndexError> {
        let id = id.into();
        if vector.is_empty() {
            return Err(IndexError::EmptyVector);
        }
        if let Some(expected) = self.dimensions {
            if vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }
        if self.positions.contains_key(&id) {
            return Err(IndexError::DuplicateId(id));
        }

        self.dimensions.get_or_insert(vector.len());
        self.positions.insert(id.clone(), self.entries.len());
        self.entries.push(SearchIndexEntry {
            id,
            vector,
            keywords,
            text: text.into(),
        });
        Ok(())
    }


    pub fn get(&self, id: &str) -> Option<&SearchIndexEntry> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }


    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }


    pub fn entries(&self) -> &[SearchIndexEntry] {
        &self.entries
    }


    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }


    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Neighbors of a stored entry, excluding the entry itself. An entry stored
    /// with a zero vector has no neighbors.
    pub fn related(&self, id: &str, k: usize) -> Option<Vec<Neighbor>> {
        let entry = self.get(id)?;
        if entry.vector.iter().all(|x| *x == 0.0) {
            return Some(Vec::new());
        }
        let mut neighbors = self.nearest(&entry.vector, k.saturating_add(1));
        neighbors.retain(|n| n.id != id);
        neighbors.truncate(k);
        Some(neighbors)
    }
}

impl VectorSearch for SimilarityIndex {
    fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut scored: Vec<Neighbor> = self
            .entries
            .iter()
            .map(|entry| Neighbor {
                id: entry.id.clone(),
                similarity: cosine_similarity(query, &entry.vector),
            })
            .collect();

        // Stable sort: equal similarities keep insertion order.
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k.min(self.entries.len()));
        debug!("nearest: scanned {} entries, returning {}", self.entries.len(), scored.len());
        scored
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
