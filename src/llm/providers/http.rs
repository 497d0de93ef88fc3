use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::{EmbeddingModel, InferenceError, SummaryBounds, SummaryModel};
use crate::utils::cap_words;

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize NASA bioscience experiment descriptions. \
Answer with two or three plain sentences covering the organism, the spaceflight condition and \
the main biological finding. Do not add facts that are not in the text.";


#[derive(Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}


fn build_client(timeout: Duration) -> Result<Client, InferenceError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Embedding model served over HTTP by Ollama or an OpenAI-compatible endpoint.
pub struct HttpEmbeddingModel {
    provider: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpEmbeddingModel {

    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let provider = provider.into().to_lowercase();
        if !matches!(provider.as_str(), "ollama" | "openai") {
            return Err(InferenceError::NotImplemented(provider));
        }
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();

        info!(
            "HttpEmbeddingModel initialized: provider={}, model={}, url={}",
            provider, model, base_url
        );

        Ok(Self {
            provider,
            base_url,
            model,
            api_key,
            client: build_client(timeout)?,
        })
    }

    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn embed_openai(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| InferenceError::InvalidResponse("API key required".to_string()))?;

        let request = OpenAIEmbeddingRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| InferenceError::InvalidResponse("No embedding in response".to_string()))
    }


    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl EmbeddingModel for HttpEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        if text.trim().is_empty() {
            return Err(InferenceError::EmptyText);
        }

        let embedding = match self.provider.as_str() {
            "ollama" => self.embed_ollama(text).await?,
            "openai" => self.embed_openai(text).await?,
            other => return Err(InferenceError::NotImplemented(other.to_string())),
        };

        if embedding.is_empty() {
            return Err(InferenceError::InvalidResponse("empty embedding".to_string()));
        }
        debug!("Embedded {} chars -> {} dims", text.len(), embedding.len());
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Abstractive summaries from a chat model served by Ollama.
pub struct OllamaSummaryModel {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaSummaryModel {

    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        info!("Ollama summary model initialized (model={}, url={})", model, base_url);
        Ok(Self {
            base_url,
            model,
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl SummaryModel for OllamaSummaryModel {
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, InferenceError> {
        if text.trim().is_empty() {
            return Err(InferenceError::EmptyText);
        }

        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: SUMMARY_SYSTEM_PROMPT.to_string(),
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Summarize in {} to {} words:\n\n{}",
                        bounds.min_tokens, bounds.max_tokens, text
                    ),
                },
            ],
            stream: false,
            // Temperature 0 keeps the output deterministic for identical input.
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: bounds.max_tokens * 2,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaChatResponse>()
            .await?;

        let summary = cap_words(response.message.content.trim(), bounds.max_tokens);
        if summary.is_empty() {
            return Err(InferenceError::InvalidResponse("empty summary".to_string()));
        }
        Ok(summary)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
