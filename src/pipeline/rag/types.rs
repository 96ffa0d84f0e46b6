use serde::{Deserialize, Serialize};

use super::RagError;

/// A guideline chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    pub source: String,
    pub chunk_index: usize,
    /// Cosine similarity to the query, higher is closer.
    pub score: f32,
}

/// Read side of the vector index (extends storage `VectorStore` for RAG queries)
pub trait VectorSearch {
    /// Up to `top_k` chunks scoring at least `score_threshold`, best first.
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>, RagError>;
}
