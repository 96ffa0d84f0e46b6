use std::path::Path;

use super::loader::load_all_documents;
use super::types::{
    Chunker, Document, EmbeddedChunk, EmbeddingModel, TextChunk, VectorPoint, VectorStore,
};
use super::StorageError;

/// Orchestrates guideline ingestion:
/// load → chunk → embed → ensure collection → upsert.
pub struct GuidelineIngestion<C: Chunker, E: EmbeddingModel, V: VectorStore> {
    chunker: C,
    embedder: E,
    vector_store: V,
}

impl<C: Chunker, E: EmbeddingModel, V: VectorStore> GuidelineIngestion<C, E, V> {
    pub fn new(chunker: C, embedder: E, vector_store: V) -> Self {
        Self {
            chunker,
            embedder,
            vector_store,
        }
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn vector_store(&self) -> &V {
        &self.vector_store
    }

    /// Hand the populated store to the read side.
    pub fn into_vector_store(self) -> V {
        self.vector_store
    }

    /// Split every document, keeping per-source ordinals.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<TextChunk> {
        let chunks: Vec<TextChunk> = documents
            .iter()
            .flat_map(|doc| self.chunker.chunk(&doc.text, &doc.source))
            .collect();
        tracing::info!(documents = documents.len(), chunks = chunks.len(), "Documents chunked");
        chunks
    }

    /// Embed all chunks. Any failure aborts the whole batch.
    pub fn embed_chunks(&self, chunks: Vec<TextChunk>) -> Result<Vec<EmbeddedChunk>, StorageError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        if embeddings.len() != chunks.len() {
            return Err(StorageError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        tracing::debug!(count = embeddings.len(), "Chunks embedded");

        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect())
    }

    /// Create the collection if needed and upsert the batch with ids from 0.
    pub fn store_chunks(&self, chunks: &[EmbeddedChunk]) -> Result<usize, StorageError> {
        self.vector_store
            .ensure_collection(self.embedder.dimension())?;
        let stored = self.vector_store.upsert(&VectorPoint::from_batch(chunks))?;
        tracing::info!(stored, "Guideline chunks stored");
        Ok(stored)
    }

    /// Run the pipeline over already-loaded documents.
    pub fn ingest_documents(&self, documents: &[Document]) -> Result<usize, StorageError> {
        let chunks = self.chunk_documents(documents);
        let embedded = self.embed_chunks(chunks)?;
        self.store_chunks(&embedded)
    }

    /// Load every supported file in `dir` and ingest it. Returns the number
    /// of points stored. A directory with no supported files is an error.
    pub fn ingest_directory(&self, dir: &Path) -> Result<usize, StorageError> {
        let documents = load_all_documents(dir)?;
        if documents.is_empty() {
            return Err(StorageError::NoDocuments(dir.to_path_buf()));
        }
        self.ingest_documents(&documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rag::VectorSearch;
    use crate::pipeline::storage::{InMemoryVectorStore, MockEmbedder, RecursiveChunker};

    fn make_pipeline() -> GuidelineIngestion<RecursiveChunker, MockEmbedder, InMemoryVectorStore> {
        GuidelineIngestion::new(
            RecursiveChunker::new(100, 10),
            MockEmbedder::with_dimension(32),
            InMemoryVectorStore::new(),
        )
    }

    struct BrokenEmbedder;

    impl EmbeddingModel for BrokenEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, StorageError> {
            Err(StorageError::Embedding("model not found".into()))
        }
        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
            Err(StorageError::Embedding("model not found".into()))
        }
        fn dimension(&self) -> usize {
            32
        }
    }

    fn doc(source: &str, text: &str) -> Document {
        Document {
            source: source.into(),
            text: text.into(),
        }
    }

    #[test]
    fn ordinals_restart_per_source() {
        let pipeline = make_pipeline();
        let long = "Blood pressure targets. ".repeat(20);
        let chunks = pipeline.chunk_documents(&[doc("a.txt", &long), doc("b.txt", &long)]);

        let first_b = chunks.iter().position(|c| c.source == "b.txt").unwrap();
        assert!(first_b > 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[first_b].chunk_index, 0);
    }

    #[test]
    fn ingest_stores_every_chunk() {
        let pipeline = make_pipeline();
        let docs = vec![
            doc("hypertension.txt", &"Target BP below 130/80 mmHg. ".repeat(12)),
            doc("diabetes.txt", "Metformin is first line therapy."),
        ];
        let expected = pipeline.chunk_documents(&docs).len();

        let stored = pipeline.ingest_documents(&docs).unwrap();
        assert_eq!(stored, expected);
        assert_eq!(pipeline.vector_store().count(), expected);
    }

    #[test]
    fn stored_chunks_are_searchable() {
        let pipeline = make_pipeline();
        pipeline
            .ingest_documents(&[doc("diabetes.txt", "Metformin is first line therapy.")])
            .unwrap();

        let query = pipeline
            .embedder()
            .embed("Metformin is first line therapy.")
            .unwrap();
        let hits = pipeline.vector_store().search(&query, 1, 0.9).unwrap();
        assert_eq!(hits[0].source, "diabetes.txt");
        assert_eq!(hits[0].chunk_index, 0);
    }

    #[test]
    fn reingest_overwrites_colliding_ids() {
        let pipeline = make_pipeline();
        let docs = vec![doc("a.txt", "One short guideline.")];
        pipeline.ingest_documents(&docs).unwrap();
        pipeline.ingest_documents(&docs).unwrap();
        assert_eq!(pipeline.vector_store().count(), 1);
    }

    #[test]
    fn embedding_failure_stores_nothing() {
        let pipeline = GuidelineIngestion::new(
            RecursiveChunker::default(),
            BrokenEmbedder,
            InMemoryVectorStore::new(),
        );
        let err = pipeline
            .ingest_documents(&[doc("a.txt", "text")])
            .unwrap_err();
        assert!(matches!(err, StorageError::Embedding(_)));
        assert_eq!(pipeline.vector_store().count(), 0);
    }

    #[test]
    fn ingest_directory_reads_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("htn.txt"), "Lifestyle changes first.").unwrap();
        std::fs::write(tmp.path().join("hf.md"), "Loop diuretics for congestion.").unwrap();
        std::fs::write(tmp.path().join("skip.csv"), "a,b").unwrap();

        let pipeline = make_pipeline();
        assert_eq!(pipeline.ingest_directory(tmp.path()).unwrap(), 2);
    }

    #[test]
    fn directory_without_supported_files_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("notes.docx"), "binary").unwrap();

        let pipeline = make_pipeline();
        let err = pipeline.ingest_directory(tmp.path()).unwrap_err();
        assert!(matches!(err, StorageError::NoDocuments(ref dir) if dir == tmp.path()));
        assert_eq!(pipeline.vector_store().count(), 0);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let pipeline = make_pipeline();
        assert!(matches!(
            pipeline.ingest_directory(Path::new("/no/such/guidelines")),
            Err(StorageError::Io { .. })
        ));
    }
}
