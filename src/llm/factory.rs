use std::sync::Arc;

use tracing::info;

use super::providers::base::{EmbeddingModel, SummaryBounds, SummaryModel};
use super::providers::http::{HttpEmbeddingModel, OllamaSummaryModel};
use super::providers::local::{HashingEmbedder, LeadSentenceSummarizer};
use super::summarizer::ExperimentSummarizer;
use crate::core::config::NullspaceConfig;
use crate::core::error::{NullspaceError, Result};


pub struct ModelFactory;

impl ModelFactory {

    pub fn summary_model(config: &NullspaceConfig) -> Result<Arc<dyn SummaryModel>> {
        let model: Arc<dyn SummaryModel> = match config.summary_provider.as_str() {
            "local" => Arc::new(LeadSentenceSummarizer::default()),
            "ollama" => Arc::new(
                OllamaSummaryModel::new(
                    config.summary_url.clone(),
                    config.summary_model.clone(),
                    config.inference_timeout(),
                )
                .map_err(|e| NullspaceError::InferenceUnavailable(e.to_string()))?,
            ),
            other => {
                return Err(NullspaceError::Config(format!(
                    "Unknown summary provider: {other}. Supported: local, ollama"
                )));
            }
        };
        info!("Summary model: {} ({})", model.model_name(), config.summary_provider);
        Ok(model)
    }


    pub fn embedding_model(config: &NullspaceConfig) -> Result<Arc<dyn EmbeddingModel>> {
        let model: Arc<dyn EmbeddingModel> = match config.embedding_provider.as_str() {
            "local" => Arc::new(HashingEmbedder::new(config.embedding_dimensions)),
            "ollama" | "openai" => Arc::new(
                HttpEmbeddingModel::new(
                    config.embedding_provider.clone(),
                    config.embedding_url.clone(),
                    config.embedding_model.clone(),
                    config.embedding_api_key.clone(),
                    config.inference_timeout(),
                )
                .map_err(|e| NullspaceError::InferenceUnavailable(e.to_string()))?,
            ),
            other => {
                return Err(NullspaceError::Config(format!(
                    "Unknown embedding provider: {other}. Supported: local, ollama, openai"
                )));
            }
        };
        info!("Embedding model: {} ({})", model.model_name(), config.embedding_provider);
        Ok(model)
    }

    /// Summarizer wired with the configured bounds and timeout.
    pub fn summarizer(config: &NullspaceConfig, model: Arc<dyn SummaryModel>) -> ExperimentSummarizer {
        ExperimentSummarizer::new(
            model,
            SummaryBounds {
                min_tokens: config.summary_min_tokens,
                max_tokens: config.summary_max_tokens,
            },
            config.summary_min_input_tokens,
            config.summary_max_input_chars,
            config.inference_timeout(),
        )
    }
}
