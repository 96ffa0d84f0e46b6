pub mod types;
pub mod retrieval;
pub mod context;

pub use types::*;
pub use retrieval::*;
pub use context::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Vector search failed: {0}")]
    VectorSearch(String),
}
