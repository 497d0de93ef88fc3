pub mod builder;
pub mod models;

pub use builder::GraphBuilder;
pub use models::{EdgePayload, GraphEdge, GraphNode, GraphPayload, KnowledgeGraph, NodePayload};
