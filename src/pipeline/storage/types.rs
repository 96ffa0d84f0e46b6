use serde::{Deserialize, Serialize};

use super::StorageError;

/// A loaded guideline document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name, used as the citation source.
    pub source: String,
    pub text: String,
}

/// A span of guideline text ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    pub source: String,
    /// Zero-based position within `source`.
    pub chunk_index: usize,
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: TextChunk,
    pub embedding: Vec<f32>,
}

/// Payload stored next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub chunk_index: usize,
}

/// One point written to the vector index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl VectorPoint {
    /// Points keyed by batch position, starting at 0.
    pub fn from_batch(chunks: &[EmbeddedChunk]) -> Vec<VectorPoint> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, c)| VectorPoint {
                id: i as u64,
                vector: c.embedding.clone(),
                payload: ChunkPayload {
                    text: c.chunk.content.clone(),
                    source: c.chunk.source.clone(),
                    chunk_index: c.chunk.chunk_index,
                },
            })
            .collect()
    }
}

/// Chunking strategy trait
pub trait Chunker {
    fn chunk(&self, text: &str, source: &str) -> Vec<TextChunk>;
}

/// Embedding model abstraction
pub trait EmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError>;
    fn dimension(&self) -> usize;
}

/// Allow `Box<dyn EmbeddingModel>` to be used as `&impl EmbeddingModel`.
impl EmbeddingModel for Box<dyn EmbeddingModel> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        (**self).embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }
}

/// Write side of the vector index. Each store is bound to one collection.
pub trait VectorStore {
    /// Create the collection with cosine distance if it does not exist yet.
    fn ensure_collection(&self, dimension: usize) -> Result<(), StorageError>;

    /// Insert or replace points by id. Returns the number written.
    fn upsert(&self, points: &[VectorPoint]) -> Result<usize, StorageError>;
}
