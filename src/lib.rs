//! Experiment indexing, semantic search and knowledge-graph construction
//! for a corpus of NASA bioscience experiment records.

pub mod core;
pub mod llm;
pub mod toolkit;
pub mod utils;

pub use utils::{normalize_label, safe_truncate, safe_truncate_ellipsis, tokenize};

pub use crate::core::config::NullspaceConfig;
pub use crate::core::error::{NullspaceError, Result};
pub use crate::core::pipeline::{BuildReport, ExperimentDetails, ExperimentPipeline, PlatformStats};
pub use crate::core::records::{ExperimentRecord, RejectedRecord};
pub use llm::{EmbeddingModel, ExperimentSummarizer, InferenceError, Summary, SummaryModel};
pub use toolkit::{
    EntityKind, GraphBuilder, KeywordExtractor, KnowledgeGraph, NormalizedEntity, RankedResult,
    Relation, RelationLabel, SearchRanker, SimilarityIndex,
};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";


pub const DEFAULT_SUMMARY_MODEL: &str = "llama3.2";


pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;


pub const DEFAULT_KEYWORD_LIMIT: usize = 10;


pub const DEFAULT_QUERY_CACHE_SIZE: usize = 1000;
