//! Embeddings, ranking and model management

pub mod embeddings;
pub mod model_manager;
pub mod ranker;

pub use embeddings::{cosine_similarity, Embedder, EmbeddingEngine};
pub use model_manager::{ModelManager, Models};
pub use ranker::{MatchResult, SimilarityRanker, TopPercent};
