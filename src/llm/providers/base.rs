

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;


#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),
}

/// Length bounds handed to a summary model, counted in whitespace tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryBounds {
    pub min_tokens: usize,
    pub max_tokens: usize,
}

impl Default for SummaryBounds {
    fn default() -> Self {
        Self {
            min_tokens: 30,
            max_tokens: 120,
        }
    }
}

/// Pretrained abstractive or extractive summarizer: text in, one summary out.
#[async_trait]
pub trait SummaryModel: Send + Sync {

    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, InferenceError>;


    fn model_name(&self) -> &str;
}

/// Text embedder with a fixed output dimensionality.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {

    async fn embed(&self, text: &str) -> Result<Vec<f32>, InferenceError>;

    /// Embeds several texts; providers with a batch endpoint may override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, InferenceError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }


    fn model_name(&self) -> &str;
}


#[async_trait]
impl SummaryModel for Arc<dyn SummaryModel> {
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, InferenceError> {
        (**self).summarize(text, bounds).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}


#[async_trait]
impl EmbeddingModel for Arc<dyn EmbeddingModel> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, InferenceError> {
        (**self).embed_batch(texts).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
