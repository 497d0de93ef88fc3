

pub mod factory;
pub mod providers;
pub mod summarizer;

pub use factory::ModelFactory;
pub use providers::{
    EmbeddingModel, HashingEmbedder, HttpEmbeddingModel, InferenceError, LeadSentenceSummarizer,
    OllamaSummaryModel, SummaryBounds, SummaryModel,
};
pub use summarizer::{ExperimentSummarizer, Summary, SummarySource};
