use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::types::{ChunkPayload, VectorPoint, VectorStore};
use super::StorageError;
use crate::config::Settings;
use crate::pipeline::rag::{RagError, ScoredChunk, VectorSearch};

/// Guideline index backed by a Qdrant server, spoken to over its REST API.
pub struct QdrantStore {
    base_url: String,
    collection: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct QdrantEnvelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Deserialize)]
struct QueryResult {
    #[serde(default)]
    points: Vec<QueryHit>,
}

#[derive(Deserialize)]
struct QueryHit {
    score: f32,
    #[serde(default)]
    payload: Option<ChunkPayload>,
}

impl QueryHit {
    fn into_scored_chunk(self) -> ScoredChunk {
        let payload = self.payload.unwrap_or(ChunkPayload {
            text: String::new(),
            source: String::new(),
            chunk_index: 0,
        });
        ScoredChunk {
            text: payload.text,
            source: payload.source,
            chunk_index: payload.chunk_index,
            score: self.score,
        }
    }
}

/// Body for `PUT /collections/{name}`
#[derive(Serialize)]
struct CreateCollectionRequest {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

/// Body for `PUT /collections/{name}/points`
#[derive(Serialize)]
struct UpsertRequest<'a> {
    points: &'a [VectorPoint],
}

/// Body for `POST /collections/{name}/points/query`
#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a [f32],
    limit: usize,
    score_threshold: f32,
    with_payload: bool,
}

fn create_collection_request(dimension: usize) -> CreateCollectionRequest {
    CreateCollectionRequest {
        vectors: VectorParams {
            size: dimension,
            distance: "Cosine",
        },
    }
}

fn upsert_request(points: &[VectorPoint]) -> UpsertRequest<'_> {
    UpsertRequest { points }
}

fn query_request(query: &[f32], limit: usize, score_threshold: f32) -> QueryRequest<'_> {
    QueryRequest {
        query,
        limit,
        score_threshold,
        with_payload: true,
    }
}

impl QdrantStore {
    pub fn new(base_url: &str, collection: &str, timeout_secs: u64) -> Result<Self, StorageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StorageError::VectorDb(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            client,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, StorageError> {
        Self::new(
            &settings.qdrant_url,
            &settings.qdrant_collection,
            settings.ollama_timeout_secs,
        )
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn collection_exists(&self) -> Result<bool, String> {
        let url = format!("{}/exists", self.collection_url());
        let response = self.client.get(&url).send().map_err(|e| self.send_error(e))?;
        let parsed: QdrantEnvelope<ExistsResult> = read_json(response)?;
        Ok(parsed.result.exists)
    }

    fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>, String> {
        let url = format!("{}/points/query", self.collection_url());
        let response = self
            .client
            .post(&url)
            .json(&query_request(query_embedding, top_k, score_threshold))
            .send()
            .map_err(|e| self.send_error(e))?;
        let parsed: QdrantEnvelope<QueryResult> = read_json(response)?;

        Ok(parsed
            .result
            .points
            .into_iter()
            .map(QueryHit::into_scored_chunk)
            .collect())
    }

    fn send_error(&self, e: reqwest::Error) -> String {
        if e.is_connect() {
            format!("Qdrant is not reachable at {}", self.base_url)
        } else {
            e.to_string()
        }
    }
}

/// Fail on non-2xx, otherwise decode the body.
fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T, String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(format!("Qdrant returned status {}: {body}", status.as_u16()));
    }
    response
        .json()
        .map_err(|e| format!("Malformed Qdrant response: {e}"))
}

impl VectorStore for QdrantStore {
    fn ensure_collection(&self, dimension: usize) -> Result<(), StorageError> {
        if self.collection_exists().map_err(StorageError::VectorDb)? {
            tracing::debug!(collection = %self.collection, "Collection already exists");
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url())
            .json(&create_collection_request(dimension))
            .send()
            .map_err(|e| StorageError::VectorDb(self.send_error(e)))?;
        read_json::<serde_json::Value>(response).map_err(StorageError::VectorDb)?;

        tracing::info!(collection = %self.collection, dimension, "Collection created");
        Ok(())
    }

    fn upsert(&self, points: &[VectorPoint]) -> Result<usize, StorageError> {
        if points.is_empty() {
            return Ok(0);
        }
        let url = format!("{}/points?wait=true", self.collection_url());
        let response = self
            .client
            .put(&url)
            .json(&upsert_request(points))
            .send()
            .map_err(|e| StorageError::VectorDb(self.send_error(e)))?;
        read_json::<serde_json::Value>(response).map_err(StorageError::VectorDb)?;
        Ok(points.len())
    }
}

impl VectorSearch for QdrantStore {
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        self.query(query_embedding, top_k, score_threshold)
            .map_err(RagError::VectorSearch)
    }
}

/// Process-local index with exact cosine search. Used when `QDRANT_URL`
/// is `:memory:` and in tests.
pub struct InMemoryVectorStore {
    inner: Mutex<InMemoryIndex>,
}

#[derive(Default)]
struct InMemoryIndex {
    dimension: Option<usize>,
    points: BTreeMap<u64, (Vec<f32>, ChunkPayload)>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(InMemoryIndex::default()),
        }
    }

    pub fn count(&self) -> usize {
        self.lock().map(|index| index.points.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryIndex>, String> {
        self.inner
            .lock()
            .map_err(|_| "In-memory index lock poisoned".to_string())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(&self, dimension: usize) -> Result<(), StorageError> {
        let mut index = self.lock().map_err(StorageError::VectorDb)?;
        if index.dimension.is_none() {
            index.dimension = Some(dimension);
        }
        Ok(())
    }

    fn upsert(&self, points: &[VectorPoint]) -> Result<usize, StorageError> {
        let mut index = self.lock().map_err(StorageError::VectorDb)?;
        let expected = match index.dimension {
            Some(dim) => dim,
            None => return Err(StorageError::VectorDb("Collection not created".into())),
        };

        for point in points {
            if point.vector.len() != expected {
                return Err(StorageError::DimensionMismatch {
                    expected,
                    actual: point.vector.len(),
                });
            }
        }
        for point in points {
            index
                .points
                .insert(point.id, (point.vector.clone(), point.payload.clone()));
        }
        Ok(points.len())
    }
}

impl VectorSearch for InMemoryVectorStore {
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let index = self.lock().map_err(RagError::VectorSearch)?;

        let mut scored: Vec<ScoredChunk> = index
            .points
            .values()
            .map(|(vector, payload)| ScoredChunk {
                text: payload.text.clone(),
                source: payload.source.clone(),
                chunk_index: payload.chunk_index,
                score: cosine_similarity(query_embedding, vector),
            })
            .filter(|chunk| chunk.score >= score_threshold)
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: u64, vector: Vec<f32>, text: &str) -> VectorPoint {
        VectorPoint {
            id,
            vector,
            payload: ChunkPayload {
                text: text.into(),
                source: "guide.txt".into(),
                chunk_index: id as usize,
            },
        }
    }

    fn seeded_store() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store.ensure_collection(3).unwrap();
        store
            .upsert(&[
                point(0, vec![1.0, 0.0, 0.0], "x-axis"),
                point(1, vec![0.0, 1.0, 0.0], "y-axis"),
                point(2, vec![0.7, 0.7, 0.0], "diagonal"),
            ])
            .unwrap();
        store
    }

    #[test]
    fn cosine_similarity_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-5);
    }

    #[test]
    fn cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn search_orders_by_score_and_limits() {
        let store = seeded_store();
        let hits = store.search(&[1.0, 0.1, 0.0], 2, 0.0).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["x-axis", "diagonal"]);
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].source, "guide.txt");
    }

    #[test]
    fn search_applies_threshold() {
        let store = seeded_store();
        let hits = store.search(&[1.0, 0.0, 0.0], 5, 0.5).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.score >= 0.5));
    }

    #[test]
    fn upsert_replaces_existing_ids() {
        let store = seeded_store();
        store
            .upsert(&[point(0, vec![0.0, 0.0, 1.0], "z-axis")])
            .unwrap();
        assert_eq!(store.count(), 3);

        let hits = store.search(&[0.0, 0.0, 1.0], 1, 0.9).unwrap();
        assert_eq!(hits[0].text, "z-axis");
    }

    #[test]
    fn upsert_checks_dimension() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection(3).unwrap();
        let err = store.upsert(&[point(0, vec![1.0, 0.0], "short")]).unwrap_err();
        assert!(matches!(
            err,
            StorageError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn upsert_before_collection_errors() {
        let store = InMemoryVectorStore::new();
        assert!(matches!(
            store.upsert(&[point(0, vec![1.0], "x")]),
            Err(StorageError::VectorDb(_))
        ));
    }

    #[test]
    fn empty_store_finds_nothing() {
        let store = InMemoryVectorStore::new();
        assert!(store.search(&[1.0, 0.0], 5, 0.0).unwrap().is_empty());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn create_collection_body_uses_cosine_distance() {
        let body = serde_json::to_value(create_collection_request(768)).unwrap();
        assert_eq!(
            body,
            json!({"vectors": {"size": 768, "distance": "Cosine"}})
        );
    }

    #[test]
    fn upsert_body_carries_vectors_and_payload() {
        let points = vec![point(4, vec![0.5, -0.25], "Target BP below 130/80.")];
        let body = serde_json::to_value(upsert_request(&points)).unwrap();
        assert_eq!(
            body,
            json!({
                "points": [{
                    "id": 4,
                    "vector": [0.5, -0.25],
                    "payload": {
                        "text": "Target BP below 130/80.",
                        "source": "guide.txt",
                        "chunk_index": 4
                    }
                }]
            })
        );
    }

    #[test]
    fn query_body_requests_payload_with_threshold() {
        let body = serde_json::to_value(query_request(&[1.0, 0.5], 3, 0.25)).unwrap();
        assert_eq!(
            body,
            json!({
                "query": [1.0, 0.5],
                "limit": 3,
                "score_threshold": 0.25,
                "with_payload": true
            })
        );
    }

    #[test]
    fn query_response_maps_to_scored_chunks() {
        let raw = r#"{
            "result": {
                "points": [
                    {"id": 7, "version": 1, "score": 0.875,
                     "payload": {"text": "Start metformin.", "source": "diabetes_type2.txt", "chunk_index": 2}},
                    {"id": 9, "version": 1, "score": 0.5}
                ]
            },
            "status": "ok",
            "time": 0.0012
        }"#;
        let parsed: QdrantEnvelope<QueryResult> = serde_json::from_str(raw).unwrap();
        let chunks: Vec<ScoredChunk> = parsed
            .result
            .points
            .into_iter()
            .map(QueryHit::into_scored_chunk)
            .collect();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Start metformin.");
        assert_eq!(chunks[0].source, "diabetes_type2.txt");
        assert_eq!(chunks[0].chunk_index, 2);
        assert_eq!(chunks[0].score, 0.875);
        assert!(chunks[1].text.is_empty());
        assert_eq!(chunks[1].score, 0.5);
    }

    #[test]
    fn exists_response_decodes() {
        let parsed: QdrantEnvelope<ExistsResult> =
            serde_json::from_str(r#"{"result": {"exists": true}, "status": "ok", "time": 0.0}"#)
                .unwrap();
        assert!(parsed.result.exists);
    }

    #[test]
    fn qdrant_store_from_settings() {
        let store = QdrantStore::from_settings(&Settings::default()).unwrap();
        assert_eq!(store.collection(), "clinical_guidelines");
        assert_eq!(
            store.collection_url(),
            "http://localhost:6333/collections/clinical_guidelines"
        );
    }

    #[test]
    fn unreachable_qdrant_is_search_error() {
        let store = QdrantStore::new("http://127.0.0.1:9", "guidelines", 2).unwrap();
        assert!(matches!(
            store.search(&[1.0], 3, 0.3),
            Err(RagError::VectorSearch(_))
        ));
        assert!(matches!(
            store.ensure_collection(3),
            Err(StorageError::VectorDb(_))
        ));
    }
}
