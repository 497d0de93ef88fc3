

pub mod base;
pub mod http;
pub mod local;

pub use base::{EmbeddingModel, InferenceError, SummaryBounds, SummaryModel};
pub use http::{HttpEmbeddingModel, OllamaSummaryModel};
pub use local::{HashingEmbedder, LeadSentenceSummarizer};
