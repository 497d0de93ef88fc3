pub mod entity;
pub mod graph;
pub mod index;
pub mod keywords;
pub mod search;

pub use entity::{EntityKind, NormalizedEntity, normalize_record, normalize_with_keywords};
pub use graph::{GraphBuilder, GraphPayload, KnowledgeGraph};
pub use index::{Neighbor, SearchIndexEntry, SimilarityIndex, VectorSearch};
pub use keywords::{KeywordExtractor, Relation, RelationLabel, ScoredKeyword, derive_relations};
pub use search::{RankedResult, SearchRanker, SignalScores};
