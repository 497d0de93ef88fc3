pub mod extractor;
pub mod relations;

pub use extractor::{KeywordExtractor, ScoredKeyword, candidates};
pub use relations::{Relation, RelationLabel, derive_relations};
