pub mod types;
pub mod loader;
pub mod chunker;
pub mod embedder;
pub mod vectordb;
pub mod orchestrator;

pub use types::*;
pub use loader::*;
pub use chunker::*;
pub use embedder::*;
pub use vectordb::*;
pub use orchestrator::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type: {extension} ({path})")]
    UnsupportedFormat { extension: String, path: PathBuf },

    #[error("No guideline documents found in {0}")]
    NoDocuments(PathBuf),

    #[error("PDF parsing failed for {path}: {reason}")]
    PdfParsing { path: PathBuf, reason: String },

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector DB error: {0}")]
    VectorDb(String),
}
