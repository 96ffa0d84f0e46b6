use std::collections::HashSet;

use super::types::{ScoredChunk, VectorSearch};
use super::RagError;
use crate::pipeline::storage::EmbeddingModel;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.3;

/// Results fetched per query when fanning out over several queries.
pub const PER_QUERY_TOP_K: usize = 3;
/// Size of the merged result set after fan-out.
pub const MERGED_LIMIT: usize = 5;

/// Embeds queries and searches the guideline index.
pub struct GuidelineRetriever<'a> {
    embedder: &'a dyn EmbeddingModel,
    index: &'a dyn VectorSearch,
    score_threshold: f32,
}

impl<'a> GuidelineRetriever<'a> {
    pub fn new(embedder: &'a dyn EmbeddingModel, index: &'a dyn VectorSearch) -> Self {
        Self {
            embedder,
            index,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    pub fn with_score_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    /// Up to `top_k` chunks at or above the score threshold, best first.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        let query_embedding = self
            .embedder
            .embed(query)
            .map_err(|e| RagError::EmbeddingFailed(e.to_string()))?;

        let mut results = self
            .index
            .search(&query_embedding, top_k, self.score_threshold)?;
        results.retain(|r| r.score >= self.score_threshold);
        sort_by_score(&mut results);
        results.truncate(top_k);

        tracing::debug!(hits = results.len(), top_k, "Guideline search");
        Ok(results)
    }

    /// Runs every query in order (top [`PER_QUERY_TOP_K`] each) and merges
    /// the hits with [`merge_results`].
    pub fn retrieve_many(&self, queries: &[String]) -> Result<Vec<ScoredChunk>, RagError> {
        let mut batches = Vec::with_capacity(queries.len());
        for query in queries {
            batches.push(self.retrieve(query, PER_QUERY_TOP_K)?);
        }
        let merged = merge_results(batches, MERGED_LIMIT);
        tracing::info!(queries = queries.len(), merged = merged.len(), "Guidelines retrieved");
        Ok(merged)
    }
}

/// Flatten per-query batches, dropping repeated chunk text (first occurrence
/// wins), then keep the `limit` best by score. Ties keep arrival order.
pub fn merge_results<I>(batches: I, limit: usize) -> Vec<ScoredChunk>
where
    I: IntoIterator<Item = Vec<ScoredChunk>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<ScoredChunk> = batches
        .into_iter()
        .flatten()
        .filter(|chunk| seen.insert(chunk.text.clone()))
        .collect();

    sort_by_score(&mut merged);
    merged.truncate(limit);
    merged
}

fn sort_by_score(chunks: &mut [ScoredChunk]) {
    chunks.sort_by(|a, b| b.score.total_cmp(&a.score));
}
