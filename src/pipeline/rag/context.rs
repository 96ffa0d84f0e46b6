use super::types::ScoredChunk;

/// Rendered when a search produced nothing usable.
pub const NO_GUIDELINE_FOUND: &str = "No relevant guideline found.";

const ENTRY_DELIMITER: &str = "\n\n---\n\n";

/// Render retrieved chunks as one prompt block. Each entry is headed by its
/// source and a two-decimal relevance score.
pub fn format_context(results: &[ScoredChunk]) -> String {
    if results.is_empty() {
        return NO_GUIDELINE_FOUND.to_string();
    }

    results
        .iter()
        .map(|r| format!("[Source: {} | Relevance: {:.2}]\n{}", r.source, r.score, r.text))
        .collect::<Vec<_>>()
        .join(ENTRY_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, source: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            text: text.into(),
            source: source.into(),
            chunk_index: 0,
            score,
        }
    }

    #[test]
    fn empty_results_render_sentinel() {
        assert_eq!(format_context(&[]), NO_GUIDELINE_FOUND);
    }

    #[test]
    fn entries_carry_source_and_score() {
        let text = format_context(&[
            chunk("Target BP below 130/80.", "hypertension.txt", 0.8765),
            chunk("Start metformin.", "diabetes.txt", 0.5),
        ]);
        assert_eq!(
            text,
            "[Source: hypertension.txt | Relevance: 0.88]\nTarget BP below 130/80.\n\n---\n\n\
             [Source: diabetes.txt | Relevance: 0.50]\nStart metformin."
        );
    }
}
