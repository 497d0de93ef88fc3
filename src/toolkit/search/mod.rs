pub mod cache;
pub mod ranker;

pub use cache::{CacheStats, QueryCache};
pub use ranker::{RankedResult, SearchRanker, SignalScores, query_tokens};
