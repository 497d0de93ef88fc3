use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::{NullspaceError, Result};
use crate::{
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_KEYWORD_LIMIT,
    DEFAULT_OLLAMA_URL, DEFAULT_QUERY_CACHE_SIZE, DEFAULT_SUMMARY_MODEL,
};

const ENV_PREFIX: &str = "NULLSPACE";


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NullspaceConfig {
    pub summary_provider: String,
    pub summary_model: String,
    pub summary_url: String,
    pub summary_min_tokens: usize,
    pub summary_max_tokens: usize,
    /// Descriptions shorter than this are returned verbatim.
    pub summary_min_input_tokens: usize,
    pub summary_max_input_chars: usize,

    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_dimensions: usize,

    pub inference_timeout_secs: u64,
    pub build_concurrency: usize,

    pub keyword_limit: usize,
    pub keyword_max_ngram: usize,

    pub lexical_weight: f64,
    pub keyword_weight: f64,
    pub embedding_weight: f64,
    pub min_embedding_similarity: f64,

    pub related_k: usize,
    pub query_cache_size: usize,
}

impl NullspaceConfig {

    pub fn new() -> Self {
        Self {
            summary_provider: "local".to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            summary_url: DEFAULT_OLLAMA_URL.to_string(),
            summary_min_tokens: 30,
            summary_max_tokens: 120,
            summary_min_input_tokens: 40,
            summary_max_input_chars: 1024,

            embedding_provider: "local".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,

            inference_timeout_secs: 30,
            build_concurrency: 8,

            keyword_limit: DEFAULT_KEYWORD_LIMIT,
            keyword_max_ngram: 2,

            lexical_weight: 1.0 / 3.0,
            keyword_weight: 1.0 / 3.0,
            embedding_weight: 1.0 / 3.0,
            min_embedding_similarity: 0.15,

            related_k: 5,
            query_cache_size: DEFAULT_QUERY_CACHE_SIZE,
        }
    }

    /// Defaults, then an optional TOML/JSON file, then `NULLSPACE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }


    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }


    pub fn validate(&self) -> Result<()> {
        if self.summary_min_tokens > self.summary_max_tokens {
            return Err(NullspaceError::Config(format!(
                "summary_min_tokens ({}) exceeds summary_max_tokens ({})",
                self.summary_min_tokens, self.summary_max_tokens
            )));
        }
        if self.summary_max_tokens == 0 || self.summary_max_input_chars == 0 {
            return Err(NullspaceError::Config(
                "summary bounds must be positive".to_string(),
            ));
        }
        if self.keyword_limit == 0 || self.keyword_max_ngram == 0 {
            return Err(NullspaceError::Config(
                "keyword_limit and keyword_max_ngram must be positive".to_string(),
            ));
        }
        if self.embedding_dimensions == 0 {
            return Err(NullspaceError::Config(
                "embedding_dimensions must be positive".to_string(),
            ));
        }
        if self.build_concurrency == 0 || self.query_cache_size == 0 {
            return Err(NullspaceError::Config(
                "build_concurrency and query_cache_size must be positive".to_string(),
            ));
        }

        let weights = [self.lexical_weight, self.keyword_weight, self.embedding_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(NullspaceError::Config(
                "ranker weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(NullspaceError::Config(
                "at least one ranker weight must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_embedding_similarity) {
            return Err(NullspaceError::Config(
                "min_embedding_similarity must lie in [0, 1]".to_string(),
            ));
        }

        if self.summary_provider != "local" {
            check_url("summary_url", &self.summary_url)?;
        }
        if self.embedding_provider != "local" {
            check_url("embedding_url", &self.embedding_url)?;
        }

        Ok(())
    }


    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }
}

impl Default for NullspaceConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    let parsed = Url::parse(value)
        .map_err(|e| NullspaceError::Config(format!("{field} is not a valid URL ({value}): {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(NullspaceError::Config(format!(
            "{field} must use http or https, got {}",
            parsed.scheme()
        )));
    }
    Ok(())
}
