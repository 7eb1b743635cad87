//! Context retrieval for a topic or question.
//!
//! Retrieval is a similarity query followed by a keyword refinement: chunks
//! that literally mention the query are preferred, but when none do the
//! similarity ranking is returned as is, so retrieval from a non-empty index
//! never comes back empty.

use examprep_core::{Chunk, Result, TextEmbedder};
use tracing::debug;

use crate::index::{IndexHandle, VectorIndex};

/// Retrieve up to `top_k` chunks relevant to `query`, in similarity order.
///
/// # Errors
/// Returns an error if the handle is closed or the query cannot be embedded.
pub async fn retrieve<E: TextEmbedder>(
    index: &VectorIndex<E>,
    handle: &IndexHandle,
    query: &str,
    top_k: usize,
) -> Result<Vec<Chunk>> {
    let candidates = index.query(handle, query, top_k).await?;
    Ok(refine_by_keyword(candidates, query))
}

/// Keep the candidates containing `query` (case-insensitive), or all of them
/// if none do.
#[must_use]
pub fn refine_by_keyword(candidates: Vec<Chunk>, query: &str) -> Vec<Chunk> {
    let needle = query.to_lowercase();
    let matching: Vec<Chunk> = candidates
        .iter()
        .filter(|chunk| chunk.text.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    if matching.is_empty() {
        debug!(
            "No chunk mentions '{query}', using {} similarity matches",
            candidates.len()
        );
        candidates
    } else {
        matching
    }
}

/// Join chunk texts into one context block, one chunk per line.
#[must_use]
pub fn join_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, order: usize) -> Chunk {
        Chunk::new(text, order, 0)
    }

    #[test]
    fn test_refine_keeps_matching_in_order() {
        let candidates = vec![
            chunk("Light reactions happen in thylakoids.", 0),
            chunk("PHOTOSYNTHESIS needs chlorophyll.", 1),
            chunk("Photosynthesis produces oxygen.", 2),
        ];

        let refined = refine_by_keyword(candidates, "photosynthesis");
        let orders: Vec<usize> = refined.iter().map(|item| item.order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn test_refine_falls_back_to_all_candidates() {
        let candidates = vec![chunk("Mitochondria make ATP.", 0), chunk("Ribosomes build proteins.", 1)];

        let refined = refine_by_keyword(candidates.clone(), "photosynthesis");
        assert_eq!(refined, candidates);
    }

    #[test]
    fn test_join_context() {
        let joined = join_context(&[chunk("first", 0), chunk("second", 1)]);
        assert_eq!(joined, "first\nsecond");
        assert_eq!(join_context(&[]), "");
    }
}
